//! Fixture schema mirroring the test database.

use chrono::{DateTime, NaiveDate, Utc};
use postgrest_orm::{IntRange, Model, WireEnum};
use rust_decimal::Decimal;
use uuid::Uuid;

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
    #[column(skip_insert, skip_update)]
    pub created_at: Option<DateTime<Utc>>,
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
    #[column(skip_insert, skip_update)]
    pub created_at: Option<DateTime<Utc>>,
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
    #[column(skip_insert, skip_update)]
    pub created_at: Option<DateTime<Utc>>,
    #[reference]
    pub person: Option<Box<Person>>,
}

/// Join table between movies and people; composite key.
#[derive(Debug, Clone, PartialEq, Model)]
#[model(table = "movie_person")]
pub struct MoviePerson {
    #[primary_key]
    pub movie_id: i32,
    #[primary_key]
    pub person_id: i32,
    #[column(skip_insert, skip_update)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One column of every supported kind.
#[derive(Debug, Clone, PartialEq, Default, Model)]
#[model(table = "kitchen_sink")]
pub struct KitchenSink {
    #[primary_key]
    #[column(skip_insert)]
    pub id: i32,
    pub string_value: Option<String>,
    pub bool_value: Option<bool>,
    pub unique_value: Option<Uuid>,
    pub int_value: Option<i32>,
    pub long_value: Option<i64>,
    pub float_value: Option<f32>,
    pub double_value: Option<f64>,
    pub numeric_value: Option<Decimal>,
    pub datetime_value: Option<DateTime<Utc>>,
    pub datetime_value_1: Option<DateTime<Utc>>,
    pub date_value: Option<NaiveDate>,
    pub list_of_strings: Option<Vec<String>>,
    pub list_of_datetimes: Option<Vec<DateTime<Utc>>>,
    pub list_of_ints: Option<Vec<i32>>,
    pub list_of_floats: Option<Vec<f32>>,
    pub int_range: Option<IntRange>,
    pub json_value: Option<serde_json::Value>,
    #[column(ignore)]
    pub scratch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Model)]
#[model(table = "users")]
pub struct User {
    #[primary_key]
    pub username: String,
    pub data: Option<serde_json::Value>,
    pub age_range: Option<IntRange>,
    pub catchphrase: Option<String>,
    pub status: Option<String>,
}

/// Two edges to `movie` plus one to `person`, each named by its foreign key.
#[derive(Debug, Clone, PartialEq, Model)]
#[model(table = "foreign_key_test")]
pub struct ForeignKeyTestModel {
    #[primary_key]
    #[column(skip_insert)]
    pub id: i32,
    #[reference(foreign_key = "foreign_key_test_relation_one")]
    pub movie_fk1: Option<Movie>,
    #[reference(foreign_key = "foreign_key_test_relation_two")]
    pub movie_fk2: Option<Movie>,
    #[reference(foreign_key = "foreign_key_random_person_fk")]
    pub random_person_fk: Option<Person>,
}

#[derive(Debug, Clone, PartialEq, Model)]
#[model(table = "nested_foreign_key_test")]
pub struct NestedForeignKeyTestModel {
    #[primary_key]
    #[column(skip_insert)]
    pub id: i32,
    #[reference(name = "foreign_key_test")]
    pub foreign_key_test_model: Option<ForeignKeyTestModel>,
    #[reference(name = "user", foreign_key = "nested_foreign_key_test_user_fkey")]
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Model)]
#[model(table = "category")]
pub struct Category {
    #[primary_key]
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Model)]
#[model(table = "product")]
pub struct Product {
    #[primary_key]
    pub id: Uuid,
    pub name: String,
    #[reference(inner)]
    pub category: Option<Category>,
}

/// Two edges to `movie` without foreign key names.
#[derive(Debug, Clone, PartialEq, Model)]
#[model(table = "foreign_key_test")]
pub struct UnhintedForeignKeyModel {
    #[primary_key]
    pub id: i32,
    #[reference]
    pub movie_fk1: Option<Movie>,
    #[reference]
    pub movie_fk2: Option<Movie>,
}
