//! Select planning: which columns and embeds a request asks for.
//!
//! The plan is a tree mirroring the reference graph. Expansion stops one hop
//! into a cycle: a type already on the path from the root is still selected,
//! but only with its columns. The materializer follows the same tree, so the
//! select clause and the decoded records always agree.

use std::any::TypeId;
use std::sync::Arc;

use crate::error::{Error, RequestBuildError, Result};
use crate::schema::{Cardinality, ReferenceDescriptor, TypeDescriptor};

/// Planned selection for one record type.
#[derive(Debug, Clone)]
pub struct SelectTree {
    descriptor: Arc<TypeDescriptor>,
    columns: Vec<String>,
    embeds: Vec<Embed>,
}

/// A reference edge embedded in the selection.
#[derive(Debug, Clone)]
pub struct Embed {
    edge: String,
    cardinality: Cardinality,
    foreign_key: Option<String>,
    inner: bool,
    tree: SelectTree,
}

/// Types on the path from the root to the node being planned.
#[derive(Debug, Default)]
pub(crate) struct TraversalPath(Vec<TypeId>);

impl TraversalPath {
    /// Whether edges of `descriptor` are followed at this point.
    pub(crate) fn expands(&self, descriptor: &TypeDescriptor) -> bool {
        !self.0.contains(&descriptor.type_id())
    }

    fn enter(&mut self, descriptor: &TypeDescriptor) {
        self.0.push(descriptor.type_id());
    }

    fn leave(&mut self) {
        self.0.pop();
    }
}

enum Requested {
    Whole,
    Partial(Vec<String>),
}

impl SelectTree {
    /// Every column, every edge, truncated at cycles.
    pub fn full(descriptor: &Arc<TypeDescriptor>) -> Result<Self> {
        Self::plan_full(descriptor, &mut TraversalPath::default())
    }

    /// An explicit selection such as `["id", "name", "people.first_name"]`.
    ///
    /// A bare edge name embeds the whole target; a dotted entry embeds the
    /// edge with only the named sub-selection. `*` stands for every column.
    /// An empty list is the full selection.
    pub fn parse<S: AsRef<str>>(descriptor: &Arc<TypeDescriptor>, entries: &[S]) -> Result<Self> {
        if entries.is_empty() {
            return Self::full(descriptor);
        }
        let entries: Vec<String> = entries.iter().map(|e| e.as_ref().to_string()).collect();
        Self::plan_entries(descriptor, &entries, &mut TraversalPath::default())
    }

    fn plan_full(descriptor: &Arc<TypeDescriptor>, path: &mut TraversalPath) -> Result<Self> {
        let columns = descriptor.columns().iter().map(|c| c.name.clone()).collect();
        let mut embeds = Vec::new();

        if path.expands(descriptor) {
            path.enter(descriptor);
            for reference in descriptor.references() {
                let target = reference.target()?;
                let tree = Self::plan_full(&target, path)?;
                embeds.push(Embed::new(descriptor, reference, tree)?);
            }
            path.leave();
        }

        Ok(Self {
            descriptor: descriptor.clone(),
            columns,
            embeds,
        })
    }

    fn plan_entries(
        descriptor: &Arc<TypeDescriptor>,
        entries: &[String],
        path: &mut TraversalPath,
    ) -> Result<Self> {
        let mut columns: Vec<String> = Vec::new();
        let mut requested: Vec<(&ReferenceDescriptor, Requested)> = Vec::new();

        for entry in entries {
            let entry = entry.trim();
            if entry.is_empty() || entry.contains(['(', ')', ',', ' ']) {
                return Err(RequestBuildError::InvalidSelect {
                    entry: entry.to_string(),
                    reason: "expected a column, an edge or a dotted path".to_string(),
                }
                .into());
            }

            if entry == "*" {
                for column in descriptor.columns() {
                    if !columns.contains(&column.name) {
                        columns.push(column.name.clone());
                    }
                }
                continue;
            }

            let (head, rest) = match entry.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (entry, None),
            };

            if let Some(reference) = descriptor.reference(head) {
                let index = match requested.iter().position(|(r, _)| r.name == reference.name) {
                    Some(index) => index,
                    None => {
                        requested.push((reference, Requested::Partial(Vec::new())));
                        requested.len() - 1
                    }
                };
                let slot = &mut requested[index].1;
                match (rest, slot) {
                    (None, slot) => *slot = Requested::Whole,
                    (Some(_), Requested::Whole) => {}
                    (Some(rest), Requested::Partial(sub)) => sub.push(rest.to_string()),
                }
                continue;
            }

            if rest.is_some() {
                return Err(RequestBuildError::UnknownEdge {
                    table: descriptor.table().to_string(),
                    edge: head.to_string(),
                }
                .into());
            }
            if descriptor.column(head).is_none() {
                return Err(RequestBuildError::UnknownColumn {
                    table: descriptor.table().to_string(),
                    column: head.to_string(),
                }
                .into());
            }
            if !columns.iter().any(|c| c == head) {
                columns.push(head.to_string());
            }
        }

        let mut embeds = Vec::new();
        if path.expands(descriptor) {
            path.enter(descriptor);
            for (reference, request) in requested {
                let target = reference.target()?;
                let tree = match request {
                    Requested::Whole => Self::plan_full(&target, path)?,
                    Requested::Partial(sub) => Self::plan_entries(&target, &sub, path)?,
                };
                embeds.push(Embed::new(descriptor, reference, tree)?);
            }
            path.leave();
        }

        Ok(Self {
            descriptor: descriptor.clone(),
            columns,
            embeds,
        })
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn embeds(&self) -> &[Embed] {
        &self.embeds
    }

    pub fn embed(&self, edge: &str) -> Option<&Embed> {
        self.embeds.iter().find(|e| e.edge == edge)
    }

    /// The `select=` clause.
    pub fn render(&self) -> String {
        self.columns
            .iter()
            .cloned()
            .chain(self.embeds.iter().map(Embed::render))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Embed {
    fn new(
        owner: &TypeDescriptor,
        reference: &ReferenceDescriptor,
        tree: SelectTree,
    ) -> Result<Self> {
        let target_table = tree.descriptor.table();

        // PostgREST cannot tell two relationships to the same table apart
        // without a foreign key hint
        let mut siblings = 0;
        for other in owner.references() {
            if other.target()?.table() == target_table {
                siblings += 1;
            }
        }
        if siblings > 1 && reference.foreign_key.is_none() {
            return Err(Error::RequestBuild(RequestBuildError::AmbiguousEmbed {
                table: owner.table().to_string(),
                edge: reference.name.clone(),
                target: target_table.to_string(),
            }));
        }

        Ok(Self {
            edge: reference.name.clone(),
            cardinality: reference.cardinality,
            foreign_key: reference.foreign_key.clone(),
            inner: reference.inner,
            tree,
        })
    }

    pub fn edge(&self) -> &str {
        &self.edge
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn tree(&self) -> &SelectTree {
        &self.tree
    }

    /// `edge:table!hint!inner(cols)`, collapsed to `table(cols)` when the edge
    /// is named after its table and carries no modifiers.
    fn render(&self) -> String {
        let table = self.tree.descriptor.table();
        let mut out = if self.edge == table {
            table.to_string()
        } else {
            format!("{}:{}", self.edge, table)
        };
        if let Some(hint) = &self.foreign_key {
            out.push('!');
            out.push_str(hint);
        }
        if self.inner {
            out.push_str("!inner");
        }
        out.push('(');
        out.push_str(&self.tree.render());
        out.push(')');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Ambiguous, Movie, Person, Product};
    use crate::schema::describe;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_selection_truncates_one_hop_into_cycle() {
        let movie = describe::<Movie>().unwrap();
        let tree = SelectTree::full(&movie).unwrap();

        // movie -> person -> movie (columns only)
        let person = tree.embed("person").unwrap().tree();
        let back = person.embed("movie").unwrap().tree();
        assert!(back.embeds().is_empty());
        assert_eq!(back.columns(), movie.columns().iter().map(|c| c.name.clone()).collect::<Vec<_>>());

        // person -> profile -> person (columns only)
        let profile = person.embed("profile").unwrap().tree();
        assert!(profile.embed("person").unwrap().tree().embeds().is_empty());
    }

    #[test]
    fn test_render_collapses_plain_embeds() {
        let person = describe::<Person>().unwrap();
        let tree = SelectTree::parse(&person, &["first_name", "profile.email"]).unwrap();
        assert_eq!(tree.render(), "first_name,profile(email)");
    }

    #[test]
    fn test_render_hints_and_inner_joins() {
        let product = describe::<Product>().unwrap();
        let tree = SelectTree::parse(&product, &["id", "category"]).unwrap();
        assert_eq!(tree.render(), "id,category!inner(id,name)");
    }

    #[test]
    fn test_aliases_disambiguated_edges() {
        let ambiguous = describe::<Ambiguous>().unwrap();
        let tree = SelectTree::parse(&ambiguous, &["id", "first.id", "second.id"]).unwrap();
        assert_eq!(
            tree.render(),
            "id,first:movie!ambiguous_first_id_fkey(id),second:movie!ambiguous_second_id_fkey(id)"
        );
    }

    #[test]
    fn test_unknown_entries_are_rejected() {
        let movie = describe::<Movie>().unwrap();
        assert_matches!(
            SelectTree::parse(&movie, &["nope"]),
            Err(Error::RequestBuild(RequestBuildError::UnknownColumn { column, .. })) if column == "nope"
        );
        assert_matches!(
            SelectTree::parse(&movie, &["nope.id"]),
            Err(Error::RequestBuild(RequestBuildError::UnknownEdge { edge, .. })) if edge == "nope"
        );
        assert_matches!(
            SelectTree::parse(&movie, &["id,name"]),
            Err(Error::RequestBuild(RequestBuildError::InvalidSelect { .. }))
        );
    }

    #[test]
    fn test_whole_edge_wins_over_partial() {
        let person = describe::<Person>().unwrap();
        let tree = SelectTree::parse(&person, &["id", "profile.email", "profile"]).unwrap();
        let profile = tree.embed("profile").unwrap().tree();
        assert!(profile.columns().len() > 1);
    }
}
