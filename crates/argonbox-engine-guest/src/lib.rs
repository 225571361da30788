//! Reference compute engine for end-to-end tests of the argonbox host.
//!
//! Built as a `cdylib` targeting `wasm32-unknown-unknown`. Exports the
//! engine ABI on top of the RustCrypto `argon2` and `blake2` crates:
//!
//! | Export             | Purpose                                         |
//! |--------------------|-------------------------------------------------|
//! | `m`, `w`           | allocate / wipe-and-free                        |
//! | `argon2_hash_wasm` | version-aware Argon2 (default build)            |
//! | `a`                | explicit-scratch Argon2 (`scratch` feature)     |
//! | `b`                | BLAKE2b with 1..=64 byte output                 |
//! | `t`, `s`           | constant-time equality of 32 / 64 byte regions  |
//!
//! Every export trusts the host for pointer validity. Lengths are checked
//! by the hashing crates and reported as reference Argon2 status codes.

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::ptr;
use std::slice;

use argon2::{Algorithm, Argon2, AssociatedData, Block, ParamsBuilder, Version};
use blake2::Blake2bVar;
use blake2::digest::{Update, VariableOutput};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Matches `Block`'s alignment so scratch areas can be used as blocks.
const ALIGN: usize = 64;

const OK: i32 = 0;
const OUTPUT_TOO_SHORT: i32 = -2;
const OUTPUT_TOO_LONG: i32 = -3;
const PWD_TOO_LONG: i32 = -5;
const SALT_TOO_SHORT: i32 = -6;
const SALT_TOO_LONG: i32 = -7;
const AD_TOO_LONG: i32 = -9;
const SECRET_TOO_LONG: i32 = -11;
const TIME_TOO_SMALL: i32 = -12;
const MEMORY_TOO_LITTLE: i32 = -14;
const MEMORY_TOO_MUCH: i32 = -15;
const LANES_TOO_FEW: i32 = -16;
const LANES_TOO_MANY: i32 = -17;
const MEMORY_ALLOCATION_ERROR: i32 = -22;
const INCORRECT_PARAMETER: i32 = -25;
const INCORRECT_TYPE: i32 = -26;

fn layout(size: usize) -> Option<Layout> {
    Layout::from_size_align(size.max(1), ALIGN).ok()
}

/// # Safety
///
/// `ptr` must be null or point to `len` readable bytes that outlive `'a`.
unsafe fn bytes<'a>(ptr: *const u8, len: usize) -> &'a [u8] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        // SAFETY: upheld by the caller.
        unsafe { slice::from_raw_parts(ptr, len) }
    }
}

/// # Safety
///
/// `ptr` must be null or point to `len` writable bytes that outlive `'a`.
unsafe fn bytes_mut<'a>(ptr: *mut u8, len: usize) -> &'a mut [u8] {
    if ptr.is_null() || len == 0 {
        &mut []
    } else {
        // SAFETY: upheld by the caller.
        unsafe { slice::from_raw_parts_mut(ptr, len) }
    }
}

fn status(err: argon2::Error) -> i32 {
    use argon2::Error;
    match err {
        Error::OutputTooShort => OUTPUT_TOO_SHORT,
        Error::OutputTooLong => OUTPUT_TOO_LONG,
        Error::PwdTooLong => PWD_TOO_LONG,
        Error::SaltTooShort => SALT_TOO_SHORT,
        Error::SaltTooLong => SALT_TOO_LONG,
        Error::AdTooLong => AD_TOO_LONG,
        Error::SecretTooLong => SECRET_TOO_LONG,
        Error::TimeTooSmall => TIME_TOO_SMALL,
        Error::MemoryTooLittle => MEMORY_TOO_LITTLE,
        Error::MemoryTooMuch => MEMORY_TOO_MUCH,
        Error::ThreadsTooFew => LANES_TOO_FEW,
        Error::ThreadsTooMany => LANES_TOO_MANY,
        Error::AlgorithmInvalid => INCORRECT_TYPE,
        _ => INCORRECT_PARAMETER,
    }
}

fn algorithm(code: u32) -> Result<Algorithm, i32> {
    match code {
        0 => Ok(Algorithm::Argon2d),
        1 => Ok(Algorithm::Argon2i),
        2 => Ok(Algorithm::Argon2id),
        _ => Err(INCORRECT_TYPE),
    }
}

struct Request<'a> {
    algorithm: Algorithm,
    version: Version,
    t_cost: u32,
    m_cost: u32,
    p_cost: u32,
    pwd: &'a [u8],
    salt: &'a [u8],
    secret: &'a [u8],
    ad: &'a [u8],
    out: &'a mut [u8],
}

impl Request<'_> {
    fn run(self, blocks: &mut [Block]) -> Result<(), i32> {
        let Self {
            algorithm,
            version,
            t_cost,
            m_cost,
            p_cost,
            pwd,
            salt,
            secret,
            ad,
            out,
        } = self;

        let mut builder = ParamsBuilder::new();
        builder
            .m_cost(m_cost)
            .t_cost(t_cost)
            .p_cost(p_cost)
            .output_len(out.len());
        if !ad.is_empty() {
            builder.data(AssociatedData::new(ad).map_err(status)?);
        }
        let params = builder.build().map_err(status)?;
        let context = if secret.is_empty() {
            Argon2::new(algorithm, version, params)
        } else {
            Argon2::new_with_secret(secret, algorithm, version, params).map_err(status)?
        };
        context
            .hash_password_into_with_memory(pwd, salt, out, blocks)
            .map_err(status)
    }

    fn run_owned(self) -> Result<(), i32> {
        let count = usize::try_from(self.m_cost).map_err(|_| MEMORY_TOO_MUCH)?;
        let mut blocks: Vec<Block> = Vec::new();
        blocks
            .try_reserve_exact(count)
            .map_err(|_| MEMORY_ALLOCATION_ERROR)?;
        blocks.resize(count, Block::default());
        let result = self.run(&mut blocks);
        blocks.fill(Block::default());
        result
    }
}

/// Allocate `size` zeroed bytes. Returns null on failure.
#[unsafe(no_mangle)]
pub extern "C" fn m(size: usize) -> *mut u8 {
    match layout(size) {
        // SAFETY: the layout has a nonzero size.
        Some(layout) => unsafe { alloc_zeroed(layout) },
        None => ptr::null_mut(),
    }
}

/// Zero and free an allocation made by [`m`].
///
/// # Safety
///
/// `ptr` must be null or come from `m(size)` and not be freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn w(ptr: *mut u8, size: usize) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: upheld by the caller.
    unsafe { bytes_mut(ptr, size) }.zeroize();
    if let Some(layout) = layout(size) {
        // SAFETY: same pointer and layout as the allocation.
        unsafe { dealloc(ptr, layout) };
    }
}

/// Version-aware Argon2. Returns a reference status code.
///
/// # Safety
///
/// Every pointer must be null or cover its length inside engine memory.
#[cfg(not(feature = "scratch"))]
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn argon2_hash_wasm(
    t_cost: u32,
    m_cost: u32,
    p_cost: u32,
    pwd: *const u8,
    pwd_len: usize,
    salt: *const u8,
    salt_len: usize,
    secret: *const u8,
    secret_len: usize,
    ad: *const u8,
    ad_len: usize,
    hash: *mut u8,
    hash_len: usize,
    variant: u32,
    version: u32,
) -> i32 {
    let (algorithm, version) = match (algorithm(variant), Version::try_from(version)) {
        (Ok(a), Ok(v)) => (a, v),
        (Err(code), _) => return code,
        (_, Err(_)) => return INCORRECT_PARAMETER,
    };
    // SAFETY: upheld by the caller.
    let request = unsafe {
        Request {
            algorithm,
            version,
            t_cost,
            m_cost,
            p_cost,
            pwd: bytes(pwd, pwd_len),
            salt: bytes(salt, salt_len),
            secret: bytes(secret, secret_len),
            ad: bytes(ad, ad_len),
            out: bytes_mut(hash, hash_len),
        }
    };
    match request.run_owned() {
        Ok(()) => OK,
        Err(code) => code,
    }
}

/// Explicit-scratch Argon2, version `0x13`. Aborts on invalid input.
///
/// # Safety
///
/// Every pointer must be null or cover its length inside engine memory,
/// and `work` must come from `m(blocks * 1024)`.
#[cfg(feature = "scratch")]
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn a(
    hash: *mut u8,
    hash_len: usize,
    work: *mut u8,
    variant: u32,
    blocks: u32,
    passes: u32,
    lanes: u32,
    pwd: *const u8,
    salt: *const u8,
    pwd_len: usize,
    salt_len: usize,
    key: *const u8,
    ad: *const u8,
    key_len: usize,
    ad_len: usize,
) {
    let Ok(algorithm) = algorithm(variant) else {
        std::process::abort();
    };
    let Ok(count) = usize::try_from(blocks) else {
        std::process::abort();
    };
    if work.is_null() || work.align_offset(ALIGN) != 0 {
        std::process::abort();
    }
    // SAFETY: `work` is a 64-byte aligned allocation of `blocks` KiB and
    // `Block` is 1 KiB with 64-byte alignment. Other pointers are upheld by
    // the caller.
    let (request, memory) = unsafe {
        (
            Request {
                algorithm,
                version: Version::V0x13,
                t_cost: passes,
                m_cost: blocks,
                p_cost: lanes,
                pwd: bytes(pwd, pwd_len),
                salt: bytes(salt, salt_len),
                secret: bytes(key, key_len),
                ad: bytes(ad, ad_len),
                out: bytes_mut(hash, hash_len),
            },
            slice::from_raw_parts_mut(work.cast::<Block>(), count),
        )
    };
    if request.run(memory).is_err() {
        std::process::abort();
    }
}

/// BLAKE2b of `msg` into `out`. `out_len` outside 1..=64 leaves `out`
/// untouched.
///
/// # Safety
///
/// Both pointers must be null or cover their lengths inside engine memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn b(out: *mut u8, out_len: usize, msg: *const u8, msg_len: usize) {
    let Ok(mut hasher) = Blake2bVar::new(out_len) else {
        return;
    };
    // SAFETY: upheld by the caller.
    let (out, msg) = unsafe { (bytes_mut(out, out_len), bytes(msg, msg_len)) };
    hasher.update(msg);
    let _ = hasher.finalize_variable(out);
}

/// # Safety
///
/// `a` and `b` must each cover `len` bytes.
unsafe fn ct_differs(a: *const u8, b: *const u8, len: usize) -> i32 {
    // SAFETY: upheld by the caller.
    let (a, b) = unsafe { (bytes(a, len), bytes(b, len)) };
    i32::from((!a.ct_eq(b)).unwrap_u8())
}

/// Constant-time equality of two 32-byte regions. `0` means equal.
///
/// # Safety
///
/// Both pointers must cover 32 bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn t(a: *const u8, b: *const u8) -> i32 {
    // SAFETY: upheld by the caller.
    unsafe { ct_differs(a, b, 32) }
}

/// Constant-time equality of two 64-byte regions. `0` means equal.
///
/// # Safety
///
/// Both pointers must cover 64 bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn s(a: *const u8, b: *const u8) -> i32 {
    // SAFETY: upheld by the caller.
    unsafe { ct_differs(a, b, 64) }
}
