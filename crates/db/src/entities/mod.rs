//! `SeaORM` entity definitions.

pub mod accounts;
pub mod transaction_categories;
pub mod transactions;

pub mod prelude {
    //! Entity re-exports.
    pub use super::accounts::Entity as Accounts;
    pub use super::transaction_categories::Entity as TransactionCategories;
    pub use super::transactions::Entity as Transactions;
}
