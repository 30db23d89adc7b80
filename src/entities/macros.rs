//! Macros for reducing boilerplate when defining models
//!
//! A model is a plain struct with the system fields flattened in and a
//! [`Model`](crate::core::record::Model) implementation. The macro below
//! generates both.

/// Define a model struct together with its `Model` implementation
///
/// The generated struct embeds [`SystemData`](crate::core::record::SystemData)
/// (identity, timestamps, authorship) and derives serde with
/// `#[serde(default)]`, so partial bodies decode onto the zero value.
///
/// # Example
///
/// ```rust,ignore
/// use warden::prelude::*;
///
/// resource_model!(BlogPost, "BlogPost", {
///     title: String,
///     body: String,
///     published: bool,
/// });
///
/// let post = BlogPost::new("Hello".to_string(), String::new(), false);
/// assert_eq!(post.id(), 0);
/// ```
#[macro_export]
macro_rules! resource_model {
    // Matched first: an `expr` fragment would commit to parsing the braces
    ($type:ident, { $($body:tt)* }) => {
        $crate::resource_model!($type, stringify!($type), { $($body)* });
    };

    (
        $type:ident,
        $type_name:expr,
        {
            $( $(#[$field_meta:meta])* $field:ident : $field_type:ty ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, Default, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(default)]
        pub struct $type {
            /// Identity, timestamps and authorship
            #[serde(flatten)]
            pub system: $crate::core::record::SystemData,
            $( $(#[$field_meta])* pub $field : $field_type ),*
        }

        impl $crate::core::record::Model for $type {
            const NAME: &'static str = $type_name;

            fn system(&self) -> &$crate::core::record::SystemData {
                &self.system
            }

            fn system_mut(&mut self) -> &mut $crate::core::record::SystemData {
                &mut self.system
            }
        }

        impl $type {
            /// Create an unsaved instance; the store assigns identity and timestamps
            #[allow(clippy::too_many_arguments)]
            pub fn new($( $field: $field_type ),*) -> Self {
                Self {
                    system: $crate::core::record::SystemData::default(),
                    $( $field ),*
                }
            }
        }
    };
}
