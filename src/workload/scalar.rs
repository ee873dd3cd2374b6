//! General-purpose register workloads, available on every CPU

#[cfg(target_arch = "x86_64")]
use std::arch::asm;
#[cfg(not(target_arch = "x86_64"))]
use std::hint::black_box;

/// Ten dependent 64-bit integer adds per iteration
#[cfg(target_arch = "x86_64")]
pub fn scalar_add(iterations: u64) {
	if iterations == 0 {
		return;
	}

	// SAFETY: registers only, every written register is declared as an output.
	unsafe {
		asm!(
			"mov {a}, 1",
			"mov {b}, 2",
			"2:",
			"add {a}, {b}",
			"add {b}, {a}",
			"add {a}, {b}",
			"add {b}, {a}",
			"add {a}, {b}",
			"add {b}, {a}",
			"add {a}, {b}",
			"add {b}, {a}",
			"add {a}, {b}",
			"add {b}, {a}",
			"dec {n}",
			"jnz 2b",
			n = inout(reg) iterations => _,
			a = out(reg) _,
			b = out(reg) _,
			options(nomem, nostack),
		);
	}
}

#[cfg(not(target_arch = "x86_64"))]
pub fn scalar_add(iterations: u64) {
	let (mut a, mut b) = (1u64, 2u64);
	for _ in 0..iterations {
		for _ in 0..5 {
			a = a.wrapping_add(b);
			b = b.wrapping_add(a);
		}
		a = black_box(a);
	}
	black_box((a, b));
}

/// Stand-in for the AMX tile unit: a short xor/inc sequence per iteration
///
/// Tile configuration (LDTILECFG) and TDP* operations are not issued. The
/// frequency this produces says nothing about real AMX throttling.
#[cfg(target_arch = "x86_64")]
pub fn matrix_placeholder(iterations: u64) {
	if iterations == 0 {
		return;
	}

	// SAFETY: registers only, every written register is declared as an output.
	unsafe {
		asm!(
			"2:",
			"xor {a}, {a}",
			"xor {b}, {b}",
			"xor {c}, {c}",
			"inc {a}",
			"inc {b}",
			"inc {c}",
			"dec {n}",
			"jnz 2b",
			n = inout(reg) iterations => _,
			a = out(reg) _,
			b = out(reg) _,
			c = out(reg) _,
			options(nomem, nostack),
		);
	}
}

#[cfg(not(target_arch = "x86_64"))]
pub fn matrix_placeholder(iterations: u64) {
	let mut acc = 0u64;
	for _ in 0..iterations {
		acc = black_box(acc ^ acc).wrapping_add(1);
	}
	black_box(acc);
}
