use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Resolved link graph of one snapshot: source path -> target path -> occurrences.
///
/// Backlink and outgoing-link lookups are computed from this map on demand; the
/// inverse map lives and dies with the snapshot that owns the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkGraph {
    resolved: BTreeMap<String, BTreeMap<String, usize>>,
    inbound: HashMap<String, BTreeSet<String>>,
}

impl LinkGraph {
    pub fn from_resolved(resolved: BTreeMap<String, BTreeMap<String, usize>>) -> Self {
        let mut inbound: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (source, targets) in &resolved {
            for target in targets.keys() {
                inbound
                    .entry(target.clone())
                    .or_default()
                    .insert(source.clone());
            }
        }
        Self { resolved, inbound }
    }

    pub fn resolved_links(&self) -> &BTreeMap<String, BTreeMap<String, usize>> {
        &self.resolved
    }

    /// Distinct destinations `source` links or embeds.
    pub fn outgoing(&self, source: &str) -> impl Iterator<Item = &str> {
        self.resolved
            .get(source)
            .into_iter()
            .flat_map(|targets| targets.keys().map(String::as_str))
    }

    /// Distinct sources that link to `target`.
    pub fn backlinks(&self, target: &str) -> impl Iterator<Item = &str> {
        self.inbound
            .get(target)
            .into_iter()
            .flat_map(|sources| sources.iter().map(String::as_str))
    }

    pub fn outgoing_count(&self, source: &str) -> usize {
        self.resolved.get(source).map_or(0, BTreeMap::len)
    }

    pub fn backlink_count(&self, target: &str) -> usize {
        self.inbound.get(target).map_or(0, BTreeSet::len)
    }
}

/// Resolves raw link text to a vault file the way the host picks a link's first destination.
#[derive(Debug, Clone, Default)]
pub(crate) struct LinkResolver {
    by_path_lower: HashMap<String, String>,
    by_name_lower: HashMap<String, Vec<String>>,
    by_stem_lower: HashMap<String, Vec<String>>,
}

impl LinkResolver {
    pub(crate) fn new<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut out = Self::default();
        for path in paths {
            out.by_path_lower.insert(path.to_lowercase(), path.to_string());

            let name = path.rsplit('/').next().unwrap_or(path);
            out.by_name_lower
                .entry(name.to_lowercase())
                .or_default()
                .push(path.to_string());

            if let Some(stem) = name.strip_suffix(".md") {
                out.by_stem_lower
                    .entry(stem.to_lowercase())
                    .or_default()
                    .push(path.to_string());
            }
        }
        out
    }

    pub(crate) fn resolve(&self, reference: &str, source: &str) -> Option<String> {
        let r = reference.trim().trim_start_matches("./").trim_start_matches('/');
        if r.is_empty() {
            return None;
        }
        let lower = r.to_lowercase();

        let src_dir = parent_dir(source);
        let mut exact = Vec::with_capacity(4);
        if !src_dir.is_empty() {
            exact.push(format!("{}/{lower}", src_dir.to_lowercase()));
            exact.push(format!("{}/{lower}.md", src_dir.to_lowercase()));
        }
        exact.push(format!("{lower}.md"));
        exact.push(lower.clone());
        if let Some(p) = exact.iter().find_map(|k| self.by_path_lower.get(k)) {
            return Some(p.clone());
        }

        if r.contains('/') {
            return None;
        }

        let candidates = self
            .by_name_lower
            .get(&lower)
            .or_else(|| self.by_stem_lower.get(&lower))?;
        pick_prefer_source(candidates, src_dir)
    }
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

fn pick_prefer_source(candidates: &[String], src_dir: &str) -> Option<String> {
    if let Some(same) = candidates.iter().find(|c| parent_dir(c) == src_dir) {
        return Some(same.clone());
    }
    candidates
        .iter()
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        .cloned()
}
