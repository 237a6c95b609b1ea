use std::fmt;

/// Unwraps an `Option` or `Result`, logging the failure before evaluating `$never`.
///
/// `expect` logs at error level and is used for lookups that must succeed.
/// `allow` logs at warn level and is used for lookups that may legitimately miss,
/// e.g. an aircraft that already left the ground radar.
#[macro_export]
macro_rules! try_log {
    (
        $expr:expr,
        expect $must:literal $(
            (
                $($must_args:expr),* $(,)?
            )
        )?
        or $never:expr
    ) => {
        {
            #[allow(clippy::question_mark)]
            if let Some(value) = $crate::TryLog::convert_or_log(
                $expr,
                format_args!($must, $($($must_args),*)?),
            ) {
                value
            } else {
                $never
            }
        }
    };
    (
        $expr:expr,
        allow $may:literal $(
            (
                $($may_args:expr),* $(,)?
            )
        )?
        or $never:expr
    ) => {
        {
            #[allow(clippy::question_mark)]
            if let Some(value) = $crate::TryLog::convert_or_warn(
                $expr,
                format_args!($may, $($($may_args),*)?),
            ) {
                value
            } else {
                $never
            }
        }
    };
}

pub use try_log;

#[macro_export]
macro_rules! try_log_return {
    ($expr:expr, expect $must:literal $(, $($must_args:expr),*)? $(,)?) => {
        $crate::try_log!($expr, expect $must $(($($must_args),*))? or return)
    };
    ($expr:expr, allow $may:literal $(, $($may_args:expr),*)? $(,)?) => {
        $crate::try_log!($expr, allow $may $(($($may_args),*))? or return)
    };
}

pub use try_log_return;

/// An expression that can be used for `$expr` in [`try_log!`](crate::try_log!).
pub trait TryLog<T>: Sized {
    /// Returns the successful result as `Some`, or logs the error with `must` at error level.
    fn convert_or_log(this: Self, must: impl fmt::Display) -> Option<T>;

    /// Returns the successful result as `Some`, or logs the error with `may` at warn level.
    fn convert_or_warn(this: Self, may: impl fmt::Display) -> Option<T>;
}

impl<T> TryLog<T> for Option<T> {
    fn convert_or_log(this: Self, must: impl fmt::Display) -> Option<T> {
        if this.is_none() {
            bevy::log::error!("{must}");
        }
        this
    }

    fn convert_or_warn(this: Self, may: impl fmt::Display) -> Option<T> {
        if this.is_none() {
            bevy::log::warn!("{may}");
        }
        this
    }
}

impl<T, E: fmt::Display> TryLog<T> for Result<T, E> {
    fn convert_or_log(this: Self, must: impl fmt::Display) -> Option<T> {
        match this {
            Ok(value) => Some(value),
            Err(err) => {
                bevy::log::error!("{must}: {err}");
                None
            }
        }
    }

    fn convert_or_warn(this: Self, may: impl fmt::Display) -> Option<T> {
        match this {
            Ok(value) => Some(value),
            Err(err) => {
                bevy::log::warn!("{may}: {err}");
                None
            }
        }
    }
}
