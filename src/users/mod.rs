pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use memory::MemoryUserStore;
pub use model::{Account, AccountPatch, NewAccount, PublicAccount, Role};
pub use postgres::PgUserStore;
pub use store::{StoreError, UserStore};
