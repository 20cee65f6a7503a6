impl std::fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationStep")
            .field("from_version", &self.from_version)
            .field("to_version", &self.to_version)
            .finish_non_exhaustive()
    }
}

impl MigrationStep {
    /// Creates a step from a transformer. The id resolver defaults to the
    /// root `id` then `metadata.id` lookup.
    pub fn new<F>(from_version: u32, to_version: u32, transform: F) -> Self
    where
        F: Fn(&ProjectRecord) -> MigrationOutcome<'_> + Send + Sync + 'static,
    {
        Self {
            from_version,
            to_version,
            transform: Arc::new(transform),
            project_id: default_project_id,
        }
    }

    /// Replaces the id resolver with the one the step's generation uses.
    pub fn with_project_id(mut self, resolver: ProjectIdFn) -> Self {
        self.project_id = resolver;
        self
    }

    pub fn apply<'a>(&self, record: &'a ProjectRecord) -> MigrationOutcome<'a> {
        (self.transform)(record)
    }

    pub fn project_id(&self, record: &ProjectRecord) -> Option<String> {
        (self.project_id)(record)
    }
}
