//! # Architecture-Specific HAL Modules
//!
//! The DPMI bridge and the TSC only exist on 32-bit x86, the only
//! architecture a DOS extender runs on. Other targets build the portable
//! parts of the HAL and use [`crate::arch_stubs`].

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86")] {
        pub mod x86;

        // Re-export the current architecture's HAL
        pub use x86 as current;
    }
}
