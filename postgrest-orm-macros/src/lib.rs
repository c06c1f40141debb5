//! Procedural macros for postgrest-orm
//!
//! - `#[derive(Model)]` - Register a struct as a table-backed record type
//! - `#[derive(WireEnum)]` - Store a unit enum as a text column

use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident, LitStr, Meta, Type,
};

/// Derive `postgrest_orm::Model` for a struct with named fields.
///
/// # Usage
///
/// ```ignore
/// #[derive(Model)]
/// #[model(table = "person")]
/// pub struct Person {
///     #[primary_key]
///     #[column(skip_insert)]
///     pub id: i32,
///     #[column(name = "first_name")]
///     pub first: String,
///     #[reference(name = "movie")]
///     pub movies: Vec<Movie>,
///     #[reference(inverse)]
///     pub profile: Option<Box<Profile>>,
///     #[column(ignore)]
///     pub scratch: Option<String>,
/// }
/// ```
///
/// Every non-reference field is a column named after the field unless
/// renamed. `#[reference]` fields become edges; the field type picks the
/// cardinality (`Vec<M>` is to-many, `Option<M>` is to-one).
/// `#[column(ignore)]` fields are neither read nor written and fall back to `Default`.
#[proc_macro_derive(Model, attributes(model, column, primary_key, reference))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_model(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derive `postgrest_orm::FieldValue` for a unit enum stored as text.
///
/// ```ignore
/// #[derive(WireEnum)]
/// #[wire_enum(rename_all = "snake_case")]
/// pub enum MovieStatus {
///     OnDisplay,
///     #[wire(rename = "off")]
///     OffDisplay,
/// }
/// ```
#[proc_macro_derive(WireEnum, attributes(wire_enum, wire))]
pub fn derive_wire_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_wire_enum(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

enum FieldRole {
    Column {
        name: String,
        primary_key: bool,
        skip_insert: bool,
        skip_update: bool,
    },
    Reference {
        name: String,
        foreign_key: Option<String>,
        inner: bool,
        inverse: bool,
    },
    Ignored,
}

struct ModelField<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    role: FieldRole,
}

fn expand_model(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(ident, "Model can only be derived for structs"));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            ident,
            "Model requires a struct with named fields",
        ));
    };

    let table = model_table(&input.attrs)?
        .unwrap_or_else(|| ident.to_string().to_case(Case::Snake));

    let fields = named
        .named
        .iter()
        .map(|field| {
            let field_ident = field
                .ident
                .as_ref()
                .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
            Ok(ModelField {
                ident: field_ident,
                ty: &field.ty,
                role: field_role(field_ident, &field.attrs)?,
            })
        })
        .collect::<syn::Result<Vec<_>>>()?;

    let mut definitions = Vec::new();
    let mut inits = Vec::new();
    let mut values = Vec::new();

    for field in &fields {
        let field_ident = field.ident;
        let field_name = field_ident.to_string().trim_start_matches("r#").to_string();
        let ty = field.ty;

        match &field.role {
            FieldRole::Column {
                name,
                primary_key,
                skip_insert,
                skip_update,
            } => {
                let mut column = quote! {
                    ::postgrest_orm::schema::ColumnDescriptor::new::<#ty>(#name, #field_name)
                };
                if *primary_key {
                    column = quote! { #column.primary_key() };
                }
                if *skip_insert {
                    column = quote! { #column.skip_insert() };
                }
                if *skip_update {
                    column = quote! { #column.skip_update() };
                }
                definitions.push(quote! { .column(#column) });
                inits.push(quote! { #field_ident: record.column::<#ty>(#name)? });
                values.push(quote! {
                    (#name, ::postgrest_orm::FieldValue::to_value(&self.#field_ident))
                });
            }
            FieldRole::Reference {
                name,
                foreign_key,
                inner,
                inverse,
            } => {
                let mut reference = quote! {
                    ::postgrest_orm::schema::ReferenceDescriptor::new::<#ty>(#name, #field_name)
                };
                if let Some(hint) = foreign_key {
                    reference = quote! { #reference.foreign_key(#hint) };
                }
                if *inner {
                    reference = quote! { #reference.inner() };
                }
                if *inverse {
                    reference = quote! { #reference.inverse() };
                }
                definitions.push(quote! { .reference(#reference) });
                inits.push(quote! { #field_ident: record.reference::<#ty>(#name)? });
            }
            FieldRole::Ignored => {
                inits.push(quote! { #field_ident: ::std::default::Default::default() });
            }
        }
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::postgrest_orm::Model for #ident #ty_generics #where_clause {
            fn definition() -> ::postgrest_orm::schema::TableDefinition {
                ::postgrest_orm::schema::TableDefinition::new(#table)
                    #(#definitions)*
            }

            #[allow(unused_mut)]
            fn from_record(
                mut record: ::postgrest_orm::Record,
            ) -> ::std::result::Result<Self, ::postgrest_orm::CoercionError> {
                ::std::result::Result::Ok(Self {
                    #(#inits,)*
                })
            }

            fn column_values(&self) -> ::std::vec::Vec<(&'static str, ::postgrest_orm::Value)> {
                ::std::vec![#(#values),*]
            }
        }
    })
}

fn model_table(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut table = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().trim().is_empty() {
                    return Err(meta.error("table name cannot be empty"));
                }
                table = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported model attribute"))
            }
        })?;
    }
    Ok(table)
}

fn field_role(ident: &Ident, attrs: &[Attribute]) -> syn::Result<FieldRole> {
    let default_name = ident.to_string().trim_start_matches("r#").to_string();

    if let Some(attr) = attrs.iter().find(|a| a.path().is_ident("reference")) {
        let mut name = default_name;
        let mut foreign_key = None;
        let mut inner = false;
        let mut inverse = false;
        if matches!(attr.meta, Meta::List(_)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    name = meta.value()?.parse::<LitStr>()?.value();
                } else if meta.path.is_ident("foreign_key") {
                    foreign_key = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("inner") {
                    inner = true;
                } else if meta.path.is_ident("inverse") {
                    inverse = true;
                } else {
                    return Err(meta.error("unsupported reference attribute"));
                }
                Ok(())
            })?;
        }
        return Ok(FieldRole::Reference {
            name,
            foreign_key,
            inner,
            inverse,
        });
    }

    let mut name = default_name;
    let mut primary_key = attrs.iter().any(|a| a.path().is_ident("primary_key"));
    let mut skip_insert = false;
    let mut skip_update = false;
    let mut ignore = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("column")) {
        if !matches!(attr.meta, Meta::List(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = meta.value()?.parse::<LitStr>()?.value();
            } else if meta.path.is_ident("primary_key") {
                primary_key = true;
            } else if meta.path.is_ident("skip_insert") {
                skip_insert = true;
            } else if meta.path.is_ident("skip_update") {
                skip_update = true;
            } else if meta.path.is_ident("ignore") {
                ignore = true;
            } else {
                return Err(meta.error("unsupported column attribute"));
            }
            Ok(())
        })?;
    }

    if ignore {
        return Ok(FieldRole::Ignored);
    }

    Ok(FieldRole::Column {
        name,
        primary_key,
        skip_insert,
        skip_update,
    })
}

fn expand_wire_enum(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(ident, "WireEnum can only be derived for enums"));
    };

    let rename_all = rename_rule(&input.attrs)?;

    let mut variants = Vec::new();
    let mut tokens = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "WireEnum variants cannot carry data",
            ));
        }
        let token = match variant_rename(&variant.attrs)? {
            Some(token) => token,
            None => match rename_all {
                Some(case) => variant.ident.to_string().to_case(case),
                None => variant.ident.to_string(),
            },
        };
        if tokens.contains(&token) {
            return Err(syn::Error::new_spanned(
                variant,
                format!("duplicate wire token `{token}`"),
            ));
        }
        variants.push(&variant.ident);
        tokens.push(token);
    }

    Ok(quote! {
        impl ::postgrest_orm::FieldValue for #ident {
            fn kind() -> ::postgrest_orm::ValueKind {
                ::postgrest_orm::ValueKind::Text
            }

            fn to_value(&self) -> ::postgrest_orm::Value {
                let token = match self {
                    #(Self::#variants => #tokens,)*
                };
                ::postgrest_orm::Value::Text(::std::string::String::from(token))
            }

            fn from_value(
                value: ::postgrest_orm::Value,
            ) -> ::std::result::Result<Self, ::postgrest_orm::Value> {
                let ::postgrest_orm::Value::Text(text) = value else {
                    return ::std::result::Result::Err(value);
                };
                let variant = match text.as_str() {
                    #(#tokens => ::std::option::Option::Some(Self::#variants),)*
                    _ => ::std::option::Option::None,
                };
                variant.ok_or(::postgrest_orm::Value::Text(text))
            }
        }

        impl ::std::convert::From<#ident> for ::postgrest_orm::Value {
            fn from(value: #ident) -> Self {
                ::postgrest_orm::FieldValue::to_value(&value)
            }
        }
    })
}

fn rename_rule(attrs: &[Attribute]) -> syn::Result<Option<Case>> {
    let mut rule = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("wire_enum")) {
        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident("rename_all") {
                return Err(meta.error("unsupported wire_enum attribute"));
            }
            let value: LitStr = meta.value()?.parse()?;
            rule = Some(match value.value().as_str() {
                "lowercase" => Case::Flat,
                "UPPERCASE" => Case::UpperFlat,
                "snake_case" => Case::Snake,
                "SCREAMING_SNAKE_CASE" => Case::UpperSnake,
                "kebab-case" => Case::Kebab,
                "camelCase" => Case::Camel,
                "PascalCase" => Case::Pascal,
                other => {
                    return Err(syn::Error::new_spanned(
                        &value,
                        format!("unsupported rename rule `{other}`"),
                    ))
                }
            });
            Ok(())
        })?;
    }
    Ok(rule)
}

fn variant_rename(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("wire")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                rename = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("unsupported wire attribute"))
            }
        })?;
    }
    Ok(rename)
}
