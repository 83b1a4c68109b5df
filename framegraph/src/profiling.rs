//! Profiling support via Tracy.
//!
//! Instrumentation is enabled by the `profiling` Cargo feature:
//!
//! ```toml
//! [dependencies]
//! redlilium-framegraph = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! The graph instruments `build` and `render`, the dummy backend instruments
//! `begin_frame` and `present_frame`, and every presented frame emits a frame
//! mark. Ephemeral ring usage is plotted as `"Ephemeral ring in flight"`.
//!
//! ```ignore
//! use redlilium_framegraph::{profile_function, profile_scope};
//!
//! fn record_shadows(backend: &mut dyn Backend) {
//!     profile_function!();
//!     {
//!         profile_scope!("cascades");
//!         // ...
//!     }
//! }
//! ```
//!
//! Without the feature all macros compile to nothing. A Tracy client must be
//! running (`tracy_client::Client::start()`) before instrumented code runs.

#[cfg(feature = "profiling")]
pub use tracy_client::{
    self, Client, frame_mark as tracy_frame_mark, plot as tracy_plot, span,
};

/// Mark the end of a frame.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! frame_mark {
    () => {
        $crate::profiling::tracy_frame_mark()
    };
}

/// Mark the end of a frame (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! frame_mark {
    () => {};
}

/// Profile the enclosing scope under `name`.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span = $crate::profiling::span!($name);
    };
}

/// Profile a scope (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Profile the enclosing function.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _profile_span = $crate::profiling::span!();
    };
}

/// Profile a function (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}

/// Plot a value over time.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        $crate::profiling::tracy_plot!($name, $value as f64)
    };
}

/// Plot a value (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        let _ = $value;
    };
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(feature = "profiling"))]
    fn test_macros_compile_to_nothing() {
        frame_mark!();
        profile_scope!("scope");
        profile_function!();
        profile_plot!("value", 42u64);
    }
}
