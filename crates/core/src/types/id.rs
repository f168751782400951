//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. IDs are opaque
//! strings because stored blobs carry ids minted by older clients
//! (`"store_1700000000000"`, `"ORD-1042"`, ...).

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `generate()`, `as_str()`
/// - `From<String>`, `From<&str>` and `Display` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use souq_core::define_id;
/// define_id!(CouponId, "cpn");
/// define_id!(BannerId, "bnr");
///
/// let coupon_id = CouponId::new("cpn_1");
/// let banner_id = BannerId::generate();
/// assert!(banner_id.as_str().starts_with("bnr_"));
///
/// // These are different types, so this won't compile:
/// // let _: CouponId = banner_id;
/// # let _ = coupon_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Prefix used by [`Self::generate`].
            pub const PREFIX: &'static str = $prefix;

            /// Wrap an existing ID value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Mint a fresh random ID (`<prefix>_<uuid>`).
            #[must_use]
            pub fn generate() -> Self {
                Self(format!("{}_{}", $prefix, $crate::types::id::random_suffix()))
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

/// Random suffix for generated IDs. Used by `define_id!`.
#[doc(hidden)]
#[must_use]
pub fn random_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

define_id!(StoreId, "store");
define_id!(OrderId, "ord");
define_id!(ProductId, "prd");
define_id!(TransactionId, "txn");
define_id!(EmployeeId, "emp");
define_id!(ShippingCompanyId, "ship");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uses_prefix() {
        let id = StoreId::generate();
        assert!(id.as_str().starts_with("store_"));
        assert_ne!(id, StoreId::generate());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = OrderId::new("ORD-1042");
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("\"ORD-1042\""));
    }
}
