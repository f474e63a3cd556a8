//! The domain entities carried by graph nodes, with their parsers and formatters.

pub mod address;
pub mod comment;
pub mod data;
pub mod email;
pub mod family;
pub mod keyword;
pub mod org;
pub mod person;
pub mod telephone;
pub mod world;

pub use address::{add_address, Address};
pub use comment::Comment;
pub use data::{add_data, Data, DataFactory};
pub use email::{Email, Uri};
pub use family::Family;
pub use keyword::Keyword;
pub use org::Organisation;
pub use person::{Birthday, NameFields, Person, PersonName};
pub use telephone::Telephone;
pub use world::{Area, Country, Place, World};
