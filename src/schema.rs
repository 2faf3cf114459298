use std::fmt;

/// How a column is read out of the node table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Identifier,
    Text,
    Category,
    Numeric,
}

/// Every node-table column the programs know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Id,
    Label,
    ModularityClass,
    Degree,
    PageRank,
    Followers,
    Popularity,
    Clustering,
    Triangles,
    Eigencentrality,
    Betweenness,
    Closeness,
    Eccentricity,
    X,
    Y,
}

impl Column {
    /// Header as it appears in `DataNodes.csv`.
    pub fn name(self) -> &'static str {
        match self {
            Column::Id => "Id",
            Column::Label => "Label",
            Column::ModularityClass => "modularity_class",
            Column::Degree => "Degree",
            Column::PageRank => "pageranks",
            Column::Followers => "followers",
            Column::Popularity => "popularity",
            Column::Clustering => "clustering",
            Column::Triangles => "triangles",
            Column::Eigencentrality => "eigencentrality",
            Column::Betweenness => "betweenesscentrality",
            Column::Closeness => "closnesscentrality",
            Column::Eccentricity => "Eccentricity",
            Column::X => "X",
            Column::Y => "Y",
        }
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Column::Id => ColumnKind::Identifier,
            Column::Label => ColumnKind::Text,
            Column::ModularityClass => ColumnKind::Category,
            _ => ColumnKind::Numeric,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The columns a program needs from the node table.
///
/// `Id` is always required and need not be listed.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub required: Vec<Column>,
    pub optional: Vec<Column>,
}

impl Schema {
    pub fn new(required: &[Column]) -> Self {
        Schema {
            required: required.to_vec(),
            optional: Vec::new(),
        }
    }

    pub fn with_optional(mut self, optional: &[Column]) -> Self {
        self.optional.extend_from_slice(optional);
        self
    }

    /// Required columns absent from `present`, `Id` first.
    pub fn missing<'a>(&self, present: impl IntoIterator<Item = &'a str> + Clone) -> Vec<String> {
        std::iter::once(Column::Id)
            .chain(self.required.iter().copied())
            .filter(|column| !present.clone().into_iter().any(|name| name == column.name()))
            .map(|column| column.name().to_string())
            .collect()
    }

    /// Metrics reporter: only the clustering column.
    pub fn clustering_check() -> Self {
        Schema::new(&[Column::Clustering])
    }

    /// Plot generator: every charted column, with optional coordinates.
    pub fn plots() -> Self {
        Schema::new(&[
            Column::Degree,
            Column::PageRank,
            Column::Followers,
            Column::Popularity,
            Column::Clustering,
            Column::Triangles,
            Column::Eigencentrality,
            Column::Betweenness,
            Column::Closeness,
            Column::ModularityClass,
            Column::Eccentricity,
        ])
        .with_optional(&[Column::X, Column::Y])
    }

    /// Insight validator.
    pub fn insights() -> Self {
        Schema::new(&[
            Column::Label,
            Column::Degree,
            Column::PageRank,
            Column::Followers,
            Column::Clustering,
            Column::ModularityClass,
            Column::Eccentricity,
            Column::Closeness,
        ])
    }
}
