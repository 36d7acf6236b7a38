/// Run a structural mutation of a tree.
///
/// A panic in the middle of a rotation or a fixup leaves links that point at
/// nodes which don't point back. With the `hardened` feature, such a panic is
/// escalated to an abort so the broken tree is never observed again.
#[inline]
pub fn mutation<R>(f: impl FnOnce() -> R) -> R {
    cfg_if::cfg_if! {
        if #[cfg(feature = "hardened")] {
            let bomb = AbortOnUnwind;
            let ret = f();
            core::mem::forget(bomb);
            ret
        } else {
            f()
        }
    }
}

/// Panics on drop. Dropping it while unwinding is a double panic, which
/// aborts.
#[cfg(feature = "hardened")]
struct AbortOnUnwind;

#[cfg(feature = "hardened")]
impl Drop for AbortOnUnwind {
    #[inline]
    fn drop(&mut self) {
        panic!("can't maintain tree invariants after unwinding");
    }
}
