#[cfg(feature = "loom")]
mod imp {
    pub(crate) use loom::{
        cell::UnsafeCell,
        sync::atomic::{AtomicI32, AtomicU8, Ordering},
    };
}

#[cfg(not(feature = "loom"))]
mod imp {
    pub(crate) use core::{
        cell::UnsafeCell,
        sync::atomic::{AtomicI32, AtomicU8, Ordering},
    };
}

pub(crate) use imp::*;
