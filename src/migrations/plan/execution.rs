impl MigrationPlan {
    /// Walks one record forward until it is current, no step matches its
    /// detected generation, or a step skips it.
    ///
    /// Pure and in-memory: the input is never mutated and nothing is
    /// written. A skip is a stop condition, not an error.
    pub fn migrate_document<'a>(&self, record: &'a ProjectRecord) -> DocumentMigration<'a> {
        let from_version = detect_version(record);
        let mut document = Cow::Borrowed(record);
        let mut version = from_version;
        let mut steps_applied = 0;
        let mut id_resolver = self
            .step_from(from_version)
            .map(|step| step.project_id)
            .unwrap_or(default_project_id as ProjectIdFn);

        let terminal = loop {
            if version >= self.current_version {
                break Terminal::UpToDate;
            }

            let Some(step) = self.step_from(version) else {
                break Terminal::NoStepFor(version);
            };

            let outcome = step.apply(&document);
            if outcome.skipped {
                event!(
                    Level::DEBUG,
                    from = step.from_version,
                    to = step.to_version,
                    reason = outcome.reason.map(|reason| reason.as_str()).unwrap_or("unspecified"),
                    "migration step skipped"
                );
                break Terminal::Skipped(outcome.reason);
            }

            let next = outcome.into_document();
            document = Cow::Owned(next);
            steps_applied += 1;
            id_resolver = step.project_id;
            event!(
                Level::DEBUG,
                from = step.from_version,
                to = step.to_version,
                "migration step applied"
            );

            version = detect_version(&document)
                .max(step.to_version)
                .max(version + 1);
        };

        let project_id = id_resolver(&document);
        let changed = steps_applied > 0 && &*document != record;

        DocumentMigration {
            document,
            project_id,
            from_version,
            to_version: version,
            steps_applied,
            terminal,
            changed,
        }
    }

    /// Convenience for callers that only want the migrated record.
    pub fn migrate_record(&self, record: &ProjectRecord) -> ProjectRecord {
        self.migrate_document(record).document.into_owned()
    }
}
