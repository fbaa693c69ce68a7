/// Extract a short type name from the full module path.
///
/// Given `"my_crate::some_module::MyType"`, returns `"MyType"`.
pub fn short_type_name(full: &str) -> &str {
    full.rsplit("::").next().unwrap_or(full)
}

/// Round a currency amount to whole cents. Claim totals are money; anything
/// past two decimals is floating-point noise, not billing information.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
