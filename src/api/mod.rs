pub mod contacts;
pub mod graphql;
pub mod health;
pub mod swagger;
