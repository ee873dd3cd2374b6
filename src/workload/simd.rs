//! Vector register workloads
//!
//! Each routine keeps its values in registers and feeds every result into the
//! next instruction, so throughput is bound by the dependency chain rather than
//! by memory or branch prediction. Operands start at zero and stay finite.

use std::arch::asm;

/// VEX-encoded 128-bit packed single-precision chain
///
/// # Safety
///
/// The CPU must support AVX.
#[target_feature(enable = "avx")]
pub unsafe fn avx128(iterations: u64) {
	if iterations == 0 {
		return;
	}

	// SAFETY: caller guarantees AVX; only the declared xmm registers are written.
	unsafe {
		asm!(
			"vxorps xmm0, xmm0, xmm0",
			"vxorps xmm1, xmm1, xmm1",
			"vaddps xmm0, xmm0, xmm1",
			"2:",
			"vmovaps xmm1, xmm0",
			"vaddps xmm0, xmm0, xmm1",
			"vmulps xmm0, xmm0, xmm1",
			"vshufps xmm1, xmm0, xmm0, 0x1B",
			"vaddps xmm0, xmm0, xmm1",
			"vmovaps xmm2, xmm0",
			"vmovaps xmm3, xmm0",
			"vaddps xmm3, xmm3, xmm2",
			"vmovaps xmm4, xmm3",
			"vmovaps xmm5, xmm4",
			"vaddps xmm5, xmm5, xmm4",
			"vmulps xmm5, xmm5, xmm3",
			"vaddps xmm0, xmm0, xmm5",
			"dec {n}",
			"jnz 2b",
			n = inout(reg) iterations => _,
			out("xmm0") _,
			out("xmm1") _,
			out("xmm2") _,
			out("xmm3") _,
			out("xmm4") _,
			out("xmm5") _,
			options(nomem, nostack),
		);
	}
}

/// Scalar double-precision SSE2 chain, the 128-bit tier without AVX
pub fn sse2_scalar(iterations: u64) {
	if iterations == 0 {
		return;
	}

	// SAFETY: SSE2 is part of the x86_64 baseline; only declared registers are written.
	unsafe {
		asm!(
			"xorpd xmm0, xmm0",
			"mov {one}, 0x3FF0000000000000",
			"movq xmm1, {one}",
			"2:",
			"addsd xmm0, xmm1",
			"mulsd xmm0, xmm1",
			"addsd xmm0, xmm1",
			"mulsd xmm0, xmm1",
			"addsd xmm0, xmm1",
			"mulsd xmm0, xmm1",
			"addsd xmm0, xmm1",
			"mulsd xmm0, xmm1",
			"dec {n}",
			"jnz 2b",
			n = inout(reg) iterations => _,
			one = out(reg) _,
			out("xmm0") _,
			out("xmm1") _,
			options(nomem, nostack),
		);
	}
}

/// 256-bit packed chain including a cross-lane permute
///
/// # Safety
///
/// The CPU must support AVX2.
#[target_feature(enable = "avx2")]
pub unsafe fn avx256(iterations: u64) {
	if iterations == 0 {
		return;
	}

	// SAFETY: caller guarantees AVX2; only the declared ymm registers are written.
	unsafe {
		asm!(
			"vxorps ymm0, ymm0, ymm0",
			"vxorps ymm1, ymm1, ymm1",
			"2:",
			"vmovaps ymm1, ymm0",
			"vaddps ymm0, ymm0, ymm1",
			"vmulps ymm0, ymm0, ymm1",
			"vpermpd ymm2, ymm0, 0x1B",
			"vaddps ymm0, ymm0, ymm2",
			"vmovaps ymm3, ymm0",
			"vaddps ymm0, ymm0, ymm3",
			"vmulps ymm0, ymm0, ymm3",
			"vaddps ymm0, ymm0, ymm1",
			"dec {n}",
			"jnz 2b",
			"vzeroupper",
			n = inout(reg) iterations => _,
			out("ymm0") _,
			out("ymm1") _,
			out("ymm2") _,
			out("ymm3") _,
			options(nomem, nostack),
		);
	}
}

/// 512-bit packed chain with fused multiply-adds
///
/// # Safety
///
/// The CPU must support AVX-512F.
#[target_feature(enable = "avx512f")]
pub unsafe fn avx512(iterations: u64) {
	if iterations == 0 {
		return;
	}

	// SAFETY: caller guarantees AVX-512F; only the declared zmm registers are written.
	unsafe {
		asm!(
			"vpxorq zmm0, zmm0, zmm0",
			"vpxorq zmm1, zmm1, zmm1",
			"2:",
			"vmovaps zmm1, zmm0",
			"vaddps zmm0, zmm0, zmm1",
			"vmulps zmm0, zmm0, zmm1",
			"vaddps zmm2, zmm0, zmm1",
			"vfmadd132ps zmm2, zmm1, zmm0",
			"vmovaps zmm3, zmm2",
			"vfmadd213ps zmm3, zmm1, zmm0",
			"vaddps zmm0, zmm0, zmm3",
			"vmulps zmm0, zmm0, zmm3",
			"dec {n}",
			"jnz 2b",
			"vzeroupper",
			n = inout(reg) iterations => _,
			out("zmm0") _,
			out("zmm1") _,
			out("zmm2") _,
			out("zmm3") _,
			options(nomem, nostack),
		);
	}
}
