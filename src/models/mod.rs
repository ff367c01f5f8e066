//! Data models for the library server

/// Implements sqlx TEXT encoding for a string-backed enum that provides
/// `as_str()` and `FromStr<Err = String>`.
macro_rules! pg_text_enum {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        // Backs `#[serde(try_from = "String")]`, so JSON and query values
        // accept any case
        impl TryFrom<String> for $ty {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

pub(crate) use pg_text_enum;

pub mod book;
pub mod borrow_request;
pub mod category;
pub mod favorite;
pub mod pagination;
pub mod stats;
pub mod transaction;
pub mod user;

pub use book::{Book, BookSummary};
pub use borrow_request::{BorrowRequest, BorrowRequestDetails, BorrowStatus};
pub use category::Category;
pub use pagination::{PageInfo, PageRequest, Paginated};
pub use stats::LibraryStats;
pub use transaction::{Transaction, TransactionDetails, TransactionKind};
pub use user::{Member, Role, User, UserClaims};
