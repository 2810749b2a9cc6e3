// src/macros.rs
#[macro_export]
macro_rules! s {
    // String shorthand!

    // Zero-arg → String::new()
    () => {
        ::std::string::String::new()
    };
    // Anything `String: From` accepts: literals, &str slices, consts
    ($expr:expr) => {
        ::std::string::String::from($expr)
    };
}
