use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use bunk_domain::{ResolutionResult, SocialSignals};
use bunk_repository::{AttendeeRepository, PersonRepository, RepositoryError, SessionRepository};
use petgraph::graphmap::UnGraphMap;
use tokio::sync::RwLock;

use crate::relationship_type::{relationship_weight, RelationshipType};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// One informational edge: a combined weight, every relationship type that
/// contributed to it, and a reminder that it never backs a new request.
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub weight: f64,
    pub relationship_types: Vec<RelationshipType>,
    pub informational_only: bool,
}

type Graph = UnGraphMap<i64, EdgeData>;

/// Per-session graph metrics, kept even when construction fails so callers
/// never have to special-case a missing entry.
#[derive(Debug, Clone, Default)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub components: usize,
    pub average_degree: f64,
    pub clustering_coefficient: f64,
}

/// A natural friend group detected by community/clique analysis.
#[derive(Debug, Clone)]
pub struct FriendGroup {
    pub members: Vec<i64>,
    pub density: f64,
    pub cohesion: f64,
}

impl FriendGroup {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn id(&self) -> String {
        let min_member = self.members.iter().min().copied().unwrap_or_default();
        format!("group_{}_{}", min_member, self.members.len())
    }
}

const HISTORICAL_LOOKUP_CHUNK: usize = 25;
const MAX_CLUSTERING_NODE_COUNT: usize = 1000;

/// Session-scoped social graphs built from family, school, and bunk
/// groupings plus decayed historical bunking, used only as a signal source
/// for confidence scoring and disambiguation — never to create requests.
pub struct SocialGraph {
    person_repo: Arc<dyn PersonRepository>,
    attendee_repo: Arc<dyn AttendeeRepository>,
    session_repo: Arc<dyn SessionRepository>,
    year: i32,
    requested_session_cm_ids: Vec<i64>,
    graphs: RwLock<HashMap<i64, Graph>>,
    stats: RwLock<HashMap<i64, GraphStats>>,
    ego_networks: RwLock<HashMap<(i64, i64), HashSet<i64>>>,
    shortest_paths: RwLock<HashMap<(i64, i64, i64), Option<u32>>>,
    friend_groups: RwLock<HashMap<i64, Vec<FriendGroup>>>,
    initialized: RwLock<bool>,
}

impl SocialGraph {
    pub fn new(
        person_repo: Arc<dyn PersonRepository>,
        attendee_repo: Arc<dyn AttendeeRepository>,
        session_repo: Arc<dyn SessionRepository>,
        year: i32,
        session_cm_ids: Vec<i64>,
    ) -> Self {
        SocialGraph {
            person_repo,
            attendee_repo,
            session_repo,
            year,
            requested_session_cm_ids: session_cm_ids,
            graphs: RwLock::new(HashMap::new()),
            stats: RwLock::new(HashMap::new()),
            ego_networks: RwLock::new(HashMap::new()),
            shortest_paths: RwLock::new(HashMap::new()),
            friend_groups: RwLock::new(HashMap::new()),
            initialized: RwLock::new(false),
        }
    }

    /// Builds every requested session's graph. Idempotent: a second call is
    /// a no-op. A session whose construction fails gets an empty graph and
    /// zeroed stats rather than failing the whole batch.
    pub async fn initialize(&self) -> Result<(), GraphError> {
        let mut initialized = self.initialized.write().await;
        if *initialized {
            return Ok(());
        }

        let session_ids = if self.requested_session_cm_ids.is_empty() {
            self.session_repo
                .list_for_year(self.year)
                .await?
                .into_iter()
                .map(|s| s.session_cm_id)
                .collect()
        } else {
            self.requested_session_cm_ids.clone()
        };

        tracing::info!(year = self.year, session_count = session_ids.len(), "building social graphs");

        let mut graphs = HashMap::new();
        let mut stats = HashMap::new();

        for session_cm_id in session_ids {
            match self.build_session_graph(session_cm_id).await {
                Ok(graph) => {
                    let session_stats = compute_stats(&graph);
                    tracing::info!(
                        session_cm_id,
                        nodes = session_stats.node_count,
                        edges = session_stats.edge_count,
                        density = session_stats.density,
                        "session social graph built"
                    );
                    graphs.insert(session_cm_id, graph);
                    stats.insert(session_cm_id, session_stats);
                }
                Err(err) => {
                    tracing::error!(session_cm_id, %err, "failed to build social graph for session");
                    graphs.insert(session_cm_id, Graph::new());
                    stats.insert(session_cm_id, GraphStats::default());
                }
            }
        }

        *self.graphs.write().await = graphs;
        *self.stats.write().await = stats;
        *initialized = true;
        Ok(())
    }

    async fn build_session_graph(&self, session_cm_id: i64) -> Result<Graph, GraphError> {
        let mut graph = Graph::new();
        self.add_informational_relationships(&mut graph, session_cm_id).await?;
        self.add_historical_bunking_relationships(&mut graph, session_cm_id).await?;
        Ok(graph)
    }

    async fn add_informational_relationships(
        &self,
        graph: &mut Graph,
        session_cm_id: i64,
    ) -> Result<(), GraphError> {
        let expanded_ids = self.session_repo.get_expanded_session_ids(session_cm_id).await?;

        let mut attendees = Vec::new();
        for id in expanded_ids {
            attendees.extend(self.attendee_repo.get_session_attendees(id, self.year).await?);
        }

        let mut families: HashMap<String, Vec<i64>> = HashMap::new();
        let mut schools: HashMap<(String, i32), Vec<i64>> = HashMap::new();
        let mut bunks: HashMap<String, Vec<i64>> = HashMap::new();

        for attendee in &attendees {
            if let Some(family_id) = &attendee.family_id {
                families.entry(family_id.clone()).or_default().push(attendee.person_cm_id);
            }
            if let (Some(school), Some(grade)) = (&attendee.school, attendee.grade) {
                schools.entry((school.clone(), grade)).or_default().push(attendee.person_cm_id);
            }
            if let Some(bunk_id) = &attendee.current_bunk_id {
                bunks.entry(bunk_id.clone()).or_default().push(attendee.person_cm_id);
            }
        }

        add_pairwise_edges(graph, families.values(), RelationshipType::Sibling);
        add_pairwise_edges(graph, schools.values(), RelationshipType::Classmate);
        add_pairwise_edges(graph, bunks.values(), RelationshipType::Bunkmate);

        Ok(())
    }

    async fn add_historical_bunking_relationships(
        &self,
        graph: &mut Graph,
        session_cm_id: i64,
    ) -> Result<(), GraphError> {
        if graph.node_count() == 0 {
            return Ok(());
        }

        let person_ids: Vec<i64> = graph.nodes().collect();
        let mut processed_pairs: HashSet<(i64, i64)> = HashSet::new();
        let mut historical_edges = 0usize;

        for chunk in person_ids.chunks(HISTORICAL_LOOKUP_CHUNK) {
            let priors = self
                .attendee_repo
                .bulk_find_prior_year_bunkmates(chunk, session_cm_id, self.year)
                .await?;

            for &person_cm_id in chunk {
                let Some(prior) = priors.get(&person_cm_id) else { continue };
                let years_ago = (self.year - prior.prior_year).max(0);
                let recency_weight = 1.0 / (1.0 + years_ago as f64 * 0.2);

                for &bunkmate_cm_id in &prior.cm_ids {
                    if !graph.contains_node(bunkmate_cm_id) {
                        continue;
                    }
                    let pair = (person_cm_id.min(bunkmate_cm_id), person_cm_id.max(bunkmate_cm_id));
                    if !processed_pairs.insert(pair) {
                        continue;
                    }
                    add_informational_edge(
                        graph,
                        person_cm_id,
                        bunkmate_cm_id,
                        RelationshipType::Bunkmate,
                        relationship_weight(RelationshipType::Bunkmate) * recency_weight,
                    );
                    historical_edges += 1;
                }
            }
        }

        if historical_edges > 0 {
            tracing::info!(session_cm_id, historical_edges, "added historical bunking edges");
        }

        Ok(())
    }

    async fn ego_network(&self, session_cm_id: i64, node: i64) -> HashSet<i64> {
        let key = (session_cm_id, node);
        if let Some(cached) = self.ego_networks.read().await.get(&key) {
            return cached.clone();
        }

        let ego = {
            let graphs = self.graphs.read().await;
            match graphs.get(&session_cm_id) {
                Some(graph) if graph.contains_node(node) => graph.neighbors(node).collect(),
                _ => HashSet::new(),
            }
        };

        self.ego_networks.write().await.insert(key, ego.clone());
        ego
    }

    async fn shortest_path_length(&self, session_cm_id: i64, source: i64, target: i64) -> Option<u32> {
        if source == target {
            return Some(0);
        }
        let key = (session_cm_id, source.min(target), source.max(target));
        if let Some(cached) = self.shortest_paths.read().await.get(&key) {
            return *cached;
        }

        let distance = {
            let graphs = self.graphs.read().await;
            graphs.get(&session_cm_id).and_then(|graph| bfs_distance(graph, source, target))
        };

        self.shortest_paths.write().await.insert(key, distance);
        distance
    }

    /// Social signals between `requester_cm_id` and `target_cm_id` within
    /// one session, defaulting to "no relationship" when either is absent
    /// from the graph.
    pub async fn get_social_signals(&self, requester_cm_id: i64, target_cm_id: i64, session_cm_id: i64) -> SocialSignals {
        let graphs = self.graphs.read().await;
        let Some(graph) = graphs.get(&session_cm_id) else {
            return SocialSignals::default_for("no_graph");
        };

        let mut signals = SocialSignals::default_for("social_graph_analysis");
        if !graph.contains_node(requester_cm_id) || !graph.contains_node(target_cm_id) {
            return signals;
        }

        let direct_edge = graph.edge_weight(requester_cm_id, target_cm_id).cloned();
        let requester_neighbors: HashSet<i64> = graph.neighbors(requester_cm_id).collect();
        let target_neighbors: HashSet<i64> = graph.neighbors(target_cm_id).collect();
        let requester_component = connected_component_of(graph, requester_cm_id);
        drop(graphs);

        let ego = self.ego_network(session_cm_id, requester_cm_id).await;
        signals.ego_network_size = ego.len();
        signals.in_ego_network = ego.contains(&target_cm_id);
        signals.in_same_component = requester_component.contains(&target_cm_id);

        if let Some(distance) = self.shortest_path_length(session_cm_id, requester_cm_id, target_cm_id).await {
            signals.social_distance = distance;
        }

        signals.mutual_connections = requester_neighbors.intersection(&target_neighbors).count();

        if ego.len() > 1 {
            let mut members = ego.clone();
            members.insert(requester_cm_id);
            let graphs = self.graphs.read().await;
            if let Some(graph) = graphs.get(&session_cm_id) {
                signals.network_density = subgraph_density(graph, &members);
            }
        }

        if let Some(edge) = direct_edge {
            signals.relationship_strength = edge.weight;
            signals.social_distance = 1;
            signals.relationship_types = edge.relationship_types.iter().map(|t| t.as_str().to_string()).collect();
            signals.informational_only = edge.informational_only;
        }

        signals
    }

    /// Enhances an ambiguous resolution with social-graph candidate
    /// ordering: same-session candidates only, top five, sorted by social
    /// distance ascending, then mutual connections and relationship
    /// strength descending.
    pub async fn enhance_resolution(
        &self,
        mut resolution: ResolutionResult,
        requester_cm_id: i64,
        session_cm_id: i64,
    ) -> ResolutionResult {
        if !resolution.is_ambiguous() || resolution.candidates.is_empty() {
            return resolution;
        }

        if self.initialize().await.is_err() {
            return resolution;
        }

        let in_graph = {
            let graphs = self.graphs.read().await;
            graphs.get(&session_cm_id).is_some_and(|g| g.contains_node(requester_cm_id))
        };
        if !in_graph {
            tracing::warn!(requester_cm_id, session_cm_id, "requester not in session social graph");
            return resolution;
        }

        let mut scored = Vec::new();
        for candidate in resolution.candidates.iter().take(5) {
            if candidate.session_cm_id != Some(session_cm_id) {
                continue;
            }
            let signals = self.get_social_signals(requester_cm_id, candidate.cm_id, session_cm_id).await;
            scored.push((candidate.clone(), signals));
        }

        scored.sort_by(|(_, a), (_, b)| {
            a.social_distance
                .cmp(&b.social_distance)
                .then(b.mutual_connections.cmp(&a.mutual_connections))
                .then(b.relationship_strength.total_cmp(&a.relationship_strength))
        });

        resolution.candidates = scored.into_iter().map(|(person, _)| person).collect();
        resolution.metadata.social_graph_enhanced = true;

        let (requester_degree, requester_clustering, component_size) = {
            let graphs = self.graphs.read().await;
            match graphs.get(&session_cm_id) {
                Some(graph) => (
                    graph.neighbors(requester_cm_id).count(),
                    local_clustering_coefficient(graph, requester_cm_id),
                    connected_component_of(graph, requester_cm_id).len(),
                ),
                None => (0, 0.0, 0),
            }
        };
        resolution.metadata.extra.insert(
            "graph_metrics".to_string(),
            serde_json::json!({
                "requester_degree": requester_degree,
                "requester_clustering": requester_clustering,
                "component_size": component_size,
            }),
        );

        resolution
    }

    /// Detects natural friend groups via maximal-clique enumeration over a
    /// session's graph (the corpus carries no Louvain implementation, so
    /// this always takes the clique-based path the original falls back to
    /// when its optional community-detection package is unavailable).
    pub async fn detect_friend_groups(&self, session_cm_id: i64, min_size: usize, max_size: usize) -> Vec<FriendGroup> {
        if let Some(cached) = self.friend_groups.read().await.get(&session_cm_id) {
            return cached
                .iter()
                .filter(|g| g.size() >= min_size && g.size() <= max_size)
                .cloned()
                .collect();
        }

        let groups = {
            let graphs = self.graphs.read().await;
            match graphs.get(&session_cm_id) {
                Some(graph) => detect_groups_by_cliques(graph, min_size, max_size),
                None => {
                    tracing::warn!(session_cm_id, "no graph available for session");
                    Vec::new()
                }
            }
        };

        self.friend_groups.write().await.insert(session_cm_id, groups.clone());
        groups
    }

    /// Campers with at most `threshold` connections in a session. Note the
    /// graph only ever contains nodes that have at least one informational
    /// edge, so a camper with zero connections of any kind never appears
    /// here — that mirrors the source this was ported from.
    pub async fn find_isolated_campers(&self, session_cm_id: i64, threshold: usize) -> Vec<i64> {
        let graphs = self.graphs.read().await;
        let Some(graph) = graphs.get(&session_cm_id) else {
            tracing::warn!(session_cm_id, "no graph available for session");
            return Vec::new();
        };
        graph
            .nodes()
            .filter(|&node| graph.neighbors(node).count() <= threshold)
            .collect()
    }

    pub async fn get_graph_metrics(&self) -> HashMap<i64, GraphStats> {
        self.stats.read().await.clone()
    }

    pub async fn contains_node(&self, session_cm_id: i64, node: i64) -> bool {
        self.graphs.read().await.get(&session_cm_id).is_some_and(|g| g.contains_node(node))
    }

    pub async fn neighbors_of(&self, session_cm_id: i64, node: i64) -> HashSet<i64> {
        self.graphs
            .read()
            .await
            .get(&session_cm_id)
            .map(|g| g.neighbors(node).collect())
            .unwrap_or_default()
    }

    pub async fn edge_between(&self, session_cm_id: i64, a: i64, b: i64) -> Option<EdgeData> {
        self.graphs.read().await.get(&session_cm_id).and_then(|g| g.edge_weight(a, b)).cloned()
    }

    /// Cached hop-count distance between two nodes within a session, `None`
    /// when no path exists.
    pub async fn shortest_path_length_between(&self, session_cm_id: i64, a: i64, b: i64) -> Option<u32> {
        self.shortest_path_length(session_cm_id, a, b).await
    }

    pub fn person_repo(&self) -> &Arc<dyn PersonRepository> {
        &self.person_repo
    }
}

fn add_pairwise_edges<'a>(graph: &mut Graph, groups: impl Iterator<Item = &'a Vec<i64>>, kind: RelationshipType) {
    let weight = relationship_weight(kind);
    for members in groups {
        if members.len() < 2 {
            continue;
        }
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                add_informational_edge(graph, members[i], members[j], kind, weight);
            }
        }
    }
}

fn add_informational_edge(graph: &mut Graph, u: i64, v: i64, kind: RelationshipType, weight: f64) {
    if let Some(edge) = graph.edge_weight_mut(u, v) {
        edge.weight += weight * 0.5;
        if !edge.relationship_types.contains(&kind) {
            edge.relationship_types.push(kind);
        }
    } else {
        graph.add_edge(u, v, EdgeData { weight, relationship_types: vec![kind], informational_only: true });
    }
}

fn compute_stats(graph: &Graph) -> GraphStats {
    let node_count = graph.node_count();
    let edge_count = graph.edge_count();

    if node_count == 0 {
        return GraphStats::default();
    }

    let density = if node_count > 1 {
        (2.0 * edge_count as f64) / (node_count as f64 * (node_count as f64 - 1.0))
    } else {
        0.0
    };

    let components = count_components(graph);

    let total_degree: usize = graph.nodes().map(|n| graph.neighbors(n).count()).sum();
    let average_degree = total_degree as f64 / node_count as f64;

    let clustering_coefficient = if node_count < MAX_CLUSTERING_NODE_COUNT {
        average_clustering(graph)
    } else {
        0.0
    };

    GraphStats { node_count, edge_count, density, components, average_degree, clustering_coefficient }
}

fn connected_component_of(graph: &Graph, start: i64) -> HashSet<i64> {
    let mut seen = HashSet::new();
    if !graph.contains_node(start) {
        return seen;
    }
    let mut stack = vec![start];
    seen.insert(start);
    while let Some(node) = stack.pop() {
        for neighbor in graph.neighbors(node) {
            if seen.insert(neighbor) {
                stack.push(neighbor);
            }
        }
    }
    seen
}

fn count_components(graph: &Graph) -> usize {
    let mut visited = HashSet::new();
    let mut count = 0;
    for node in graph.nodes() {
        if visited.contains(&node) {
            continue;
        }
        let component = connected_component_of(graph, node);
        visited.extend(component);
        count += 1;
    }
    count
}

fn bfs_distance(graph: &Graph, source: i64, target: i64) -> Option<u32> {
    if !graph.contains_node(source) || !graph.contains_node(target) {
        return None;
    }
    if source == target {
        return Some(0);
    }
    let mut visited = HashSet::new();
    visited.insert(source);
    let mut frontier = VecDeque::new();
    frontier.push_back((source, 0u32));
    while let Some((node, distance)) = frontier.pop_front() {
        for neighbor in graph.neighbors(node) {
            if neighbor == target {
                return Some(distance + 1);
            }
            if visited.insert(neighbor) {
                frontier.push_back((neighbor, distance + 1));
            }
        }
    }
    None
}

fn subgraph_density(graph: &Graph, members: &HashSet<i64>) -> f64 {
    if members.len() < 2 {
        return 0.0;
    }
    let mut edges = 0usize;
    for &a in members {
        for &b in members {
            if a < b && graph.contains_edge(a, b) {
                edges += 1;
            }
        }
    }
    let n = members.len() as f64;
    (2.0 * edges as f64) / (n * (n - 1.0))
}

fn local_clustering_coefficient(graph: &Graph, node: i64) -> f64 {
    let neighbors: Vec<i64> = graph.neighbors(node).collect();
    let k = neighbors.len();
    if k < 2 {
        return 0.0;
    }
    let mut links = 0usize;
    for i in 0..neighbors.len() {
        for j in (i + 1)..neighbors.len() {
            if graph.contains_edge(neighbors[i], neighbors[j]) {
                links += 1;
            }
        }
    }
    let possible = (k * (k - 1)) / 2;
    links as f64 / possible as f64
}

fn average_clustering(graph: &Graph) -> f64 {
    let nodes: Vec<i64> = graph.nodes().collect();
    if nodes.is_empty() {
        return 0.0;
    }
    let total: f64 = nodes.iter().map(|&n| local_clustering_coefficient(graph, n)).sum();
    total / nodes.len() as f64
}

/// Enumerates maximal cliques with Bron-Kerbosch pivoting and keeps the
/// ones sized within `[min_size, max_size]`. Cliques are complete by
/// construction, so density is always 1.0; cohesion is the average edge
/// weight, capped at 1.0.
fn detect_groups_by_cliques(graph: &Graph, min_size: usize, max_size: usize) -> Vec<FriendGroup> {
    let mut cliques = Vec::new();
    let all_nodes: HashSet<i64> = graph.nodes().collect();
    bron_kerbosch(graph, HashSet::new(), all_nodes, HashSet::new(), &mut cliques);

    cliques
        .into_iter()
        .filter(|clique| clique.len() >= min_size && clique.len() <= max_size)
        .map(|clique| {
            let density = subgraph_density(graph, &clique);
            let cohesion = cohesion_of(graph, &clique);
            let mut members: Vec<i64> = clique.into_iter().collect();
            members.sort_unstable();
            FriendGroup { members, density, cohesion }
        })
        .collect()
}

fn cohesion_of(graph: &Graph, members: &HashSet<i64>) -> f64 {
    if members.len() < 2 {
        return 0.0;
    }
    let mut total_weight = 0.0;
    let mut edges = 0usize;
    for &a in members {
        for &b in members {
            if a < b {
                if let Some(edge) = graph.edge_weight(a, b) {
                    total_weight += edge.weight;
                    edges += 1;
                }
            }
        }
    }
    if edges == 0 {
        return 0.0;
    }
    let average_weight = total_weight / edges as f64;
    let n = members.len() as f64;
    let max_possible_edges = n * (n - 1.0) / 2.0;
    (edges as f64 / max_possible_edges * average_weight).min(1.0)
}

fn bron_kerbosch(graph: &Graph, r: HashSet<i64>, mut p: HashSet<i64>, mut x: HashSet<i64>, cliques: &mut Vec<HashSet<i64>>) {
    if p.is_empty() && x.is_empty() {
        if !r.is_empty() {
            cliques.push(r);
        }
        return;
    }

    let pivot = p
        .iter()
        .chain(x.iter())
        .max_by_key(|&&n| graph.neighbors(n).filter(|nb| p.contains(nb)).count())
        .copied();
    let pivot_neighbors: HashSet<i64> = pivot.map(|pv| graph.neighbors(pv).collect()).unwrap_or_default();
    let candidates: Vec<i64> = p.iter().filter(|n| !pivot_neighbors.contains(n)).copied().collect();

    for v in candidates {
        let v_neighbors: HashSet<i64> = graph.neighbors(v).collect();
        let mut r2 = r.clone();
        r2.insert(v);
        let p2: HashSet<i64> = p.intersection(&v_neighbors).copied().collect();
        let x2: HashSet<i64> = x.intersection(&v_neighbors).copied().collect();
        bron_kerbosch(graph, r2, p2, x2, cliques);
        p.remove(&v);
        x.insert(v);
    }
}

#[cfg(test)]
mod tests {
    use bunk_domain::{AttendeeInfo, Person, Session, SessionType};
    use bunk_repository::{BunkAssignment, InMemoryAttendeeRepository, InMemoryPersonRepository, InMemorySessionRepository};

    use super::*;

    fn person(cm_id: i64) -> Person {
        Person {
            cm_id,
            first_name: "Test".to_string(),
            last_name: format!("Person{cm_id}"),
            preferred_name: None,
            grade: None,
            birth_date: None,
            school: None,
            city: None,
            state: None,
            session_cm_id: Some(1),
            parent_names: Vec::new(),
        }
    }

    fn attendee(person_cm_id: i64, family_id: Option<&str>, bunk_id: Option<&str>) -> AttendeeInfo {
        AttendeeInfo {
            person_cm_id,
            session_cm_id: 1,
            school: Some("Lakeview".to_string()),
            grade: Some(5),
            city: None,
            state: None,
            family_id: family_id.map(str::to_string),
            current_bunk_id: bunk_id.map(str::to_string),
        }
    }

    fn graph_with_siblings_and_bunkmates() -> SocialGraph {
        let people = vec![person(1), person(2), person(3), person(4)];
        let attendees = vec![
            (2026, attendee(1, Some("fam-a"), Some("Cedar"))),
            (2026, attendee(2, Some("fam-a"), Some("Cedar"))),
            (2026, attendee(3, None, Some("Cedar"))),
            (2026, attendee(4, None, None)),
        ];
        let sessions = vec![Session {
            session_cm_id: 1,
            year: 2026,
            name: "Session A".to_string(),
            session_type: SessionType::Main,
            parent_session_cm_id: None,
        }];

        SocialGraph::new(
            Arc::new(InMemoryPersonRepository::new(people)),
            Arc::new(InMemoryAttendeeRepository::new(attendees, Vec::<BunkAssignment>::new())),
            Arc::new(InMemorySessionRepository::new(sessions)),
            2026,
            vec![1],
        )
    }

    #[tokio::test]
    async fn sibling_and_bunkmate_edges_are_added() {
        let graph = graph_with_siblings_and_bunkmates();
        graph.initialize().await.unwrap();

        assert!(graph.contains_node(1, 1).await);
        assert!(graph.contains_node(1, 4).await, "bunk grouping needs 2+ members");

        let edge = graph.edge_between(1, 1, 2).await.unwrap();
        assert!(edge.relationship_types.contains(&RelationshipType::Sibling));
        assert!(edge.relationship_types.contains(&RelationshipType::Bunkmate));
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let graph = graph_with_siblings_and_bunkmates();
        graph.initialize().await.unwrap();
        graph.initialize().await.unwrap();
        assert_eq!(graph.get_graph_metrics().await.len(), 1);
    }

    #[tokio::test]
    async fn social_signals_report_direct_connection() {
        let graph = graph_with_siblings_and_bunkmates();
        graph.initialize().await.unwrap();

        let signals = graph.get_social_signals(1, 2, 1).await;
        assert_eq!(signals.social_distance, 1);
        assert!(signals.relationship_strength > 0.0);
    }

    #[tokio::test]
    async fn social_signals_default_for_missing_session() {
        let graph = graph_with_siblings_and_bunkmates();
        graph.initialize().await.unwrap();

        let signals = graph.get_social_signals(1, 2, 999).await;
        assert_eq!(signals.found_by, "no_graph");
        assert_eq!(signals.social_distance, SocialSignals::NO_PATH_DISTANCE);
    }

    #[tokio::test]
    async fn isolated_campers_excludes_well_connected_nodes() {
        let graph = graph_with_siblings_and_bunkmates();
        graph.initialize().await.unwrap();

        let isolated = graph.find_isolated_campers(1, 1).await;
        assert!(!isolated.contains(&1));
    }

    #[tokio::test]
    async fn friend_groups_respect_size_bounds() {
        let graph = graph_with_siblings_and_bunkmates();
        graph.initialize().await.unwrap();

        let groups = graph.detect_friend_groups(1, 3, 8).await;
        assert!(groups.iter().all(|g| g.size() >= 3));
    }
}
