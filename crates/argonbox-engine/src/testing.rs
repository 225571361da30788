//! Deterministic mock engines for tests.
//!
//! The mock speaks the real ABI but replaces Argon2 with a cheap byte mix
//! that depends on every input, so tests can check determinism, profile
//! dispatch, status codes and allocation failure without a real engine.
//!
//! Magic inputs on the version-aware entry point:
//!
//! - salt shorter than 8 bytes returns status `-6`
//! - `m > 1048576` returns status `-22`
//! - `t == 998` loops until interrupted
//! - `t == 999` spins for a while before answering
//! - `t == 1000` traps

use crate::loader::{EngineImage, EngineLoader};

/// Time cost that makes the mock loop until its call is cancelled.
pub const HANG_TIME_COST: u32 = 998;
/// Time cost that makes the mock spin before answering.
pub const SLOW_TIME_COST: u32 = 999;
/// Time cost that makes the mock trap.
pub const TRAP_TIME_COST: u32 = 1000;

const PRELUDE: &str = r#"
  (memory (export "memory") 1 512)
  (global $next (mut i32) (i32.const 1024))

  (func $alloc (export "m") (param $n i32) (result i32)
    (local $p i32) (local $end i32) (local $need i32)
    (if (i32.gt_u (local.get $n) (i32.const 0x01000000))
      (then (return (i32.const 0))))
    (local.set $p (global.get $next))
    (local.set $end
      (i32.and
        (i32.add (i32.add (local.get $p) (local.get $n)) (i32.const 7))
        (i32.const -8)))
    (local.set $need
      (i32.sub
        (i32.shr_u (i32.add (local.get $end) (i32.const 65535)) (i32.const 16))
        (memory.size)))
    (if (i32.gt_s (local.get $need) (i32.const 0))
      (then
        (if (i32.eq (memory.grow (local.get $need)) (i32.const -1))
          (then (return (i32.const 0))))))
    (global.set $next (local.get $end))
    (local.get $p))

  (func $wipe (export "w") (param $p i32) (param $n i32)
    (memory.fill (local.get $p) (i32.const 0) (local.get $n)))

  (func $mix (param $out i32) (param $outl i32) (param $a i32) (param $al i32)
             (param $b i32) (param $bl i32) (param $tweak i32)
    (local $i i32) (local $v i32)
    (block $done
      (loop $next
        (br_if $done (i32.ge_u (local.get $i) (local.get $outl)))
        (local.set $v (i32.xor (local.get $tweak) (local.get $i)))
        (if (local.get $al)
          (then
            (local.set $v
              (i32.xor (local.get $v)
                (i32.load8_u
                  (i32.add (local.get $a) (i32.rem_u (local.get $i) (local.get $al))))))))
        (if (local.get $bl)
          (then
            (local.set $v
              (i32.add (local.get $v)
                (i32.load8_u
                  (i32.add (local.get $b) (i32.rem_u (local.get $i) (local.get $bl))))))))
        (i32.store8 (i32.add (local.get $out) (local.get $i)) (local.get $v))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $next))))

  (func $tweak (param $t i32) (param $variant i32) (param $version i32) (param $m i32)
               (param $p i32) (param $secl i32) (param $adl i32) (result i32)
    (i32.add (local.get $t)
      (i32.add (i32.mul (local.get $variant) (i32.const 3))
        (i32.add (i32.mul (local.get $version) (i32.const 5))
          (i32.add (i32.shr_u (local.get $m) (i32.const 10))
            (i32.add (i32.mul (local.get $p) (i32.const 7))
              (i32.add (i32.mul (local.get $secl) (i32.const 11))
                (i32.mul (local.get $adl) (i32.const 13)))))))))

  (func $blake2b (export "b") (param $out i32) (param $outl i32) (param $msg i32) (param $ml i32)
    (call $mix (local.get $out) (local.get $outl)
      (local.get $msg) (local.get $ml) (local.get $msg) (local.get $ml) (i32.const 0x5a)))
"#;

const VERSIONED: &str = r#"
  (func $versioned (export "argon2_hash_wasm")
    (param $t i32) (param $m i32) (param $p i32)
    (param $pwd i32) (param $pwdl i32) (param $salt i32) (param $saltl i32)
    (param $sec i32) (param $secl i32) (param $ad i32) (param $adl i32)
    (param $out i32) (param $outl i32) (param $variant i32) (param $version i32)
    (result i32)
    (local $k i32)
    (if (i32.lt_u (local.get $saltl) (i32.const 8))
      (then (return (i32.const -6))))
    (if (i32.gt_u (local.get $m) (i32.const 1048576))
      (then (return (i32.const -22))))
    (if (i32.eq (local.get $t) (i32.const 1000))
      (then (unreachable)))
    (if (i32.eq (local.get $t) (i32.const 998))
      (then (loop $hang (br $hang))))
    (if (i32.eq (local.get $t) (i32.const 999))
      (then
        (loop $spin
          (local.set $k (i32.add (local.get $k) (i32.const 1)))
          (br_if $spin (i32.lt_u (local.get $k) (i32.const 300000000))))))
    (call $mix (local.get $out) (local.get $outl)
      (local.get $pwd) (local.get $pwdl) (local.get $salt) (local.get $saltl)
      (call $tweak (local.get $t) (local.get $variant) (local.get $version)
        (local.get $m) (local.get $p) (local.get $secl) (local.get $adl)))
    (i32.const 0))
"#;

const SCRATCH: &str = r#"
  (func $scratch (export "a")
    (param $out i32) (param $outl i32) (param $work i32) (param $variant i32)
    (param $blocks i32) (param $t i32) (param $p i32)
    (param $pwd i32) (param $salt i32) (param $pwdl i32) (param $saltl i32)
    (param $key i32) (param $ad i32) (param $keyl i32) (param $adl i32)
    (i32.store8
      (i32.sub
        (i32.add (local.get $work) (i32.shl (local.get $blocks) (i32.const 10)))
        (i32.const 1))
      (i32.const 1))
    (call $mix (local.get $out) (local.get $outl)
      (local.get $pwd) (local.get $pwdl) (local.get $salt) (local.get $saltl)
      (call $tweak (local.get $t) (local.get $variant) (i32.const 0x13)
        (local.get $blocks) (local.get $p) (local.get $keyl) (local.get $adl))))
"#;

const COMPARATORS: &str = r#"
  (func $eq (param $a i32) (param $b i32) (param $n i32) (result i32)
    (local $i i32) (local $acc i32)
    (block $done
      (loop $next
        (br_if $done (i32.ge_u (local.get $i) (local.get $n)))
        (local.set $acc
          (i32.or (local.get $acc)
            (i32.xor
              (i32.load8_u (i32.add (local.get $a) (local.get $i)))
              (i32.load8_u (i32.add (local.get $b) (local.get $i))))))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $next)))
    (local.get $acc))
  (func (export "t") (param i32 i32) (result i32)
    (call $eq (local.get 0) (local.get 1) (i32.const 32)))
  (func (export "s") (param i32 i32) (result i32)
    (call $eq (local.get 0) (local.get 1) (i32.const 64)))
"#;

/// Builder for a mock engine module in text format.
#[derive(Debug, Clone, Copy)]
pub struct MockEngine {
    versioned: bool,
    scratch: bool,
    comparators: bool,
}

impl MockEngine {
    /// Version-aware entry point only.
    #[must_use]
    pub fn versioned() -> Self {
        Self {
            versioned: true,
            scratch: false,
            comparators: false,
        }
    }

    /// Explicit-scratch entry point only.
    #[must_use]
    pub fn scratch() -> Self {
        Self {
            versioned: false,
            scratch: true,
            comparators: false,
        }
    }

    /// Also export the `t`/`s` comparators.
    #[must_use]
    pub fn with_comparators(mut self) -> Self {
        self.comparators = true;
        self
    }

    /// Module text.
    #[must_use]
    pub fn wat(&self) -> String {
        let mut wat = String::from("(module");
        wat.push_str(PRELUDE);
        if self.versioned {
            wat.push_str(VERSIONED);
        }
        if self.scratch {
            wat.push_str(SCRATCH);
        }
        if self.comparators {
            wat.push_str(COMPARATORS);
        }
        wat.push(')');
        wat
    }

    /// Load the module with `loader`.
    ///
    /// # Panics
    ///
    /// If the mock fails to load.
    #[must_use]
    pub fn load_with(&self, loader: &EngineLoader) -> EngineImage {
        loader
            .load_bytes(self.wat().as_bytes())
            .expect("mock engine loads")
    }

    /// Load the module with a default loader.
    ///
    /// # Panics
    ///
    /// If the mock fails to load.
    #[must_use]
    pub fn image(&self) -> EngineImage {
        self.load_with(&EngineLoader::new())
    }
}
