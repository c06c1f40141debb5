//! Record types shared by the unit tests.

use chrono::{DateTime, Utc};

use crate::{Model, WireEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, WireEnum)]
pub enum MovieStatus {
    OnDisplay,
    OffDisplay,
}

#[derive(Debug, Clone, PartialEq, Model)]
#[model(table = "movie")]
pub struct Movie {
    #[primary_key]
    #[column(skip_insert)]
    pub id: i32,
    pub name: Option<String>,
    pub status: Option<MovieStatus>,
    pub created_at: DateTime<Utc>,
    #[reference(name = "person")]
    pub people: Vec<Person>,
}

#[derive(Debug, Clone, PartialEq, Model)]
#[model(table = "person")]
pub struct Person {
    #[primary_key]
    #[column(skip_insert)]
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    #[reference(name = "movie")]
    pub movies: Vec<Movie>,
    #[reference(inverse)]
    pub profile: Option<Box<Profile>>,
}

#[derive(Debug, Clone, PartialEq, Model)]
#[model(table = "profile")]
pub struct Profile {
    #[primary_key]
    pub person_id: i32,
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[reference]
    pub person: Option<Box<Person>>,
}

#[derive(Debug, Clone, PartialEq, Model)]
#[model(table = "category")]
pub struct Category {
    #[primary_key]
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Model)]
#[model(table = "product")]
pub struct Product {
    #[primary_key]
    pub id: i32,
    pub name: String,
    #[reference(inner)]
    pub category: Option<Category>,
}

/// Two edges to the same table, told apart by foreign key.
#[derive(Debug, Clone, PartialEq, Model)]
#[model(table = "ambiguous")]
pub struct Ambiguous {
    #[primary_key]
    pub id: i32,
    #[reference(foreign_key = "ambiguous_first_id_fkey")]
    pub first: Option<Movie>,
    #[reference(foreign_key = "ambiguous_second_id_fkey")]
    pub second: Option<Movie>,
}

#[derive(Debug, Clone, PartialEq, Model)]
#[model(table = "ambiguous")]
pub struct AmbiguousUnhinted {
    #[primary_key]
    pub id: i32,
    #[reference]
    pub first: Option<Movie>,
    #[reference]
    pub second: Option<Movie>,
}
