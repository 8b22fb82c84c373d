//! Internal helper macros.

/// Declares numeric error code constants together with a lookup for their
/// human readable messages.
macro_rules! define_error_codes {
    ($($name:ident = $code:literal => $msg:literal),* $(,)?) => {
        $(
            #[doc = $msg]
            pub const $name: u32 = $code;
        )*

        /// Returns the message registered for an error code.
        pub fn get_error_message(code: u32) -> &'static str {
            match code {
                $($code => $msg,)*
                _ => "Unknown Error",
            }
        }
    };
}
