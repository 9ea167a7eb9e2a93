/// Evaluates `$block` and logs its wall time at debug level. Extra tracing
/// fields can be passed between braces, each followed by a comma.
#[macro_export]
macro_rules! timer_debug {
    ($msg:literal, { $($field:tt)* }, $block:expr) => {{
        let started_at = jiff::Timestamp::now();
        let result = $block;
        let elapsed = jiff::Timestamp::now().duration_since(started_at);

        tracing::debug!($($field)* elapsed = ?elapsed, "{}", $msg);

        result
    }};
    ($msg:literal, $block:expr) => {
        $crate::timer_debug!($msg, {}, $block)
    };
}
