/// A named subscription to a search query. Tracks the most recent record id
/// observed so later polls can be scoped to unseen records only.
///
/// A feed is owned exclusively by its poll loop; there is no shared registry.
#[derive(Debug, Clone)]
pub struct Feed {
    name: String,
    query: String,
    last_seen_id: Option<String>,
    is_first_poll: bool,
}

impl Feed {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            last_seen_id: None,
            is_first_poll: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn last_seen_id(&self) -> Option<&str> {
        self.last_seen_id.as_deref()
    }

    pub fn is_first_poll(&self) -> bool {
        self.is_first_poll
    }

    /// Auxiliary filter tokens scoping the next search. The first poll (or a
    /// feed that has never seen a record) fetches the broadest recent window.
    pub fn scoped_args(&self) -> Vec<String> {
        match &self.last_seen_id {
            Some(id) if !self.is_first_poll => vec![format!("since_id:{}", id)],
            _ => Vec::new(),
        }
    }

    /// Record the id of the newest fetched record as the high-water mark.
    /// The search API returns results in descending recency order, so the
    /// first record of a batch is the newest; no scan for a maximum.
    pub fn record_seen(&mut self, id: &str) {
        self.last_seen_id = Some(id.to_string());
        self.is_first_poll = false;
    }
}
