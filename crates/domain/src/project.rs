/// Kinds of serverless projects that accept role assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectKind {
    /// Elasticsearch projects.
    Elasticsearch,
    /// Observability projects.
    Observability,
    /// Security projects.
    Security,
}

impl ProjectKind {
    /// Returns all known project kinds.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[ProjectKind] = &[
            ProjectKind::Elasticsearch,
            ProjectKind::Observability,
            ProjectKind::Security,
        ];

        ALL
    }
}
