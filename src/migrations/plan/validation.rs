impl MigrationPlan {
    /// Creates an empty plan targeting `current_version`.
    pub fn new(current_version: u32) -> Self {
        Self {
            current_version,
            steps: Vec::new(),
        }
    }

    /// Builds a plan from steps in any order. Call [`validate`](Self::validate)
    /// before trusting it; the store runner does.
    pub fn from_steps<I>(current_version: u32, steps: I) -> Self
    where
        I: IntoIterator<Item = MigrationStep>,
    {
        let mut steps = steps.into_iter().collect::<Vec<_>>();
        steps.sort_by_key(|step| step.from_version);
        Self {
            current_version,
            steps,
        }
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    /// Registered steps, ordered by `from_version`.
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// Adds a step, rejecting it if the resulting plan would be invalid.
    pub fn add_step(&mut self, step: MigrationStep) -> Result<()> {
        let mut candidate = self.steps.clone();
        candidate.push(step);
        let candidate = Self::from_steps(self.current_version, candidate);
        candidate.validate()?;
        self.steps = candidate.steps;
        Ok(())
    }

    /// Fluent builder method to add a step.
    pub fn with_step(mut self, step: MigrationStep) -> Result<Self> {
        self.add_step(step)?;
        Ok(self)
    }

    /// Validates the integrity of the plan.
    ///
    /// Checks for:
    /// - a non-zero target version,
    /// - single-version steps (`to == from + 1`),
    /// - step bounds (`to <= current`),
    /// - duplicate steps,
    /// - gaps between consecutive steps.
    pub fn validate(&self) -> Result<()> {
        if self.current_version == 0 {
            return Err(MigrateError::InvalidPlan(
                "Target schema version must be >= 1".to_string(),
            ));
        }

        let mut seen_from = HashSet::<u32>::new();
        for step in &self.steps {
            if step.from_version.checked_add(1) != Some(step.to_version) {
                return Err(MigrateError::InvalidPlan(format!(
                    "Migration step {} -> {} must advance exactly one version",
                    step.from_version, step.to_version
                )));
            }
            if step.to_version > self.current_version {
                return Err(MigrateError::InvalidPlan(format!(
                    "Migration step {} -> {} exceeds target schema version {}",
                    step.from_version, step.to_version, self.current_version
                )));
            }
            if !seen_from.insert(step.from_version) {
                return Err(MigrateError::InvalidPlan(format!(
                    "Duplicate migration step starting at version {}",
                    step.from_version
                )));
            }
        }

        for pair in self.steps.windows(2) {
            if pair[0].to_version != pair[1].from_version {
                return Err(MigrateError::InvalidPlan(format!(
                    "Gap in migration chain between version {} and {}",
                    pair[0].to_version, pair[1].from_version
                )));
            }
        }

        Ok(())
    }

    /// `true` when the chain ends exactly at the target version.
    pub fn is_complete(&self) -> bool {
        self.validate().is_ok()
            && self
                .steps
                .last()
                .is_some_and(|step| step.to_version == self.current_version)
    }

    /// The step registered for records at `version`.
    pub fn step_from(&self, version: u32) -> Option<&MigrationStep> {
        self.steps.iter().find(|step| step.from_version == version)
    }
}
