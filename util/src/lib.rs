//! Utility library for the Atom autonomous software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod host;
pub mod logger;
pub mod params;
pub mod session;
pub mod time;

// ---------------------------------------------------------------------------
// MACROS
// ---------------------------------------------------------------------------

/// Fire an unrecoverable error which will panic.
///
/// # Notes
/// - It is prefered to return a `Result<_, Error>` instead of raising an
///   error as this allows the application to potentially handle it.
#[macro_export]
macro_rules! raise_error {
    () => ({
        log::error!("Explicit error raised.");
        std::panic!("Unrecoverable error");
    });
    ($fmt:expr) => ({
        log::error!("{}", $fmt);
        std::panic!("Unrecoverable error");
    });
    ($fmt:expr, $($arg:tt)*) => ({
        log::error!("{}", std::format_args!($fmt, $($arg)+));
        std::panic!("Unrecoverable error");
    });
}
