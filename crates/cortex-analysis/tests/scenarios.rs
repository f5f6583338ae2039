//! End-to-end scenarios across store, graph, and analysis.
//!
//! Each test drives the public API the way the CLI does: seed a store,
//! build the graph, run a query, and check the shape of the result.

use cortex_analysis::{
    digest, ContextAssembler, ContextRequest, DeadCodeAnalyzer, DeadRequest, Density,
    ImpactAnalyzer, ImpactRequest, SmartContextRequest,
};
use cortex_config::CxConfig;
use cortex_core::dependency::Dependency;
use cortex_core::entity::Entity;
use cortex_core::enums::{DepType, EntityKind, Visibility};
use cortex_core::metrics::EntityMetrics;
use cortex_graph::{compute_all, CancelToken, DepGraph, MetricsOptions};
use cortex_storage::{ResetMode, SqliteStore, Store};

fn entity(name: &str, file: &str) -> Entity {
    Entity::new(name, EntityKind::Function, file)
}

fn seed(store: &SqliteStore, name: &str, file: &str) -> Entity {
    let e = entity(name, file);
    store.create_entity(&e).unwrap();
    e
}

fn link(store: &SqliteStore, from: &Entity, to: &Entity, dep_type: DepType) {
    store
        .create_dependency(&Dependency::new(&from.id, &to.id, dep_type))
        .unwrap();
}

/// File context: a target file plus its callers at hop 1.
#[test]
fn scenario_file_context() {
    let store = SqliteStore::open_in_memory().unwrap();
    let func_a = seed(&store, "FuncA", "pkg/handler.go");
    let func_b = seed(&store, "FuncB", "pkg/handler.go");
    let func_c = seed(&store, "FuncC", "cmd/main.go");
    link(&store, &func_c, &func_a, DepType::Calls);

    let graph = DepGraph::build_from_store(&store).unwrap();
    let config = CxConfig::default();
    let mut request = ContextRequest::new("pkg/handler.go");
    request.include = vec!["callers".into()];

    let pack = ContextAssembler::new(&store, &graph, &config)
        .assemble(&request)
        .unwrap();

    let ids: Vec<&str> = pack.relevant.iter().map(|e| e.id.as_str()).collect();
    assert!(ids.contains(&func_a.id.as_str()));
    assert!(ids.contains(&func_b.id.as_str()));
    assert!(ids.contains(&func_c.id.as_str()));

    let hop1 = pack.relevant.iter().find(|e| e.id == func_c.id).unwrap();
    assert_eq!(hop1.hop, 1);
    assert_eq!(hop1.reason, "Hop 1 from target");
}

/// Budget pruning in importance mode keeps only the fitting prefix.
#[test]
fn scenario_budget_pruning_importance_mode() {
    let store = SqliteStore::open_in_memory().unwrap();
    let high = seed(&store, "High", "pkg/a.go");
    let mid = seed(&store, "Mid", "pkg/b.go");
    let low = seed(&store, "Low", "pkg/c.go");
    link(&store, &high, &mid, DepType::Calls);
    link(&store, &high, &low, DepType::Calls);

    // importance = 0.7 * page_rank, so these give 0.9 / 0.5 / 0.05.
    store
        .save_bulk_metrics(&[
            EntityMetrics {
                page_rank: 0.9 / 0.7,
                ..EntityMetrics::zero(&high.id)
            },
            EntityMetrics {
                page_rank: 0.5 / 0.7,
                ..EntityMetrics::zero(&mid.id)
            },
            EntityMetrics {
                page_rank: 0.05 / 0.7,
                ..EntityMetrics::zero(&low.id)
            },
        ])
        .unwrap();

    let graph = DepGraph::build_from_store(&store).unwrap();
    let config = CxConfig::default();
    // Sparse single-word entries cost 18 tokens each; budget fits one.
    let mut request = ContextRequest::new(high.id.clone());
    request.density = Density::Sparse;
    request.max_tokens = 27;

    let pack = ContextAssembler::new(&store, &graph, &config)
        .assemble(&request)
        .unwrap();

    assert_eq!(pack.relevant.len(), 1);
    assert_eq!(pack.relevant[0].id, high.id);
    assert_eq!(pack.dropped, 2);
    assert!(pack
        .warnings
        .iter()
        .any(|w| w.contains("Budget exceeded")));
    assert!(pack.total_tokens <= request.max_tokens);
}

/// The dead-code tier fixpoint and chain grouping.
#[test]
fn scenario_dead_code_tiers_and_chains() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut dead_private = entity("deadPrivate", "pkg/a.go");
    dead_private.visibility = Visibility::Private;
    let mut suspicious = entity("suspicious", "pkg/a.go");
    suspicious.visibility = Visibility::Private;
    let mut caller = entity("caller", "pkg/b.go");
    caller.visibility = Visibility::Public;
    let mut alive = entity("alive", "pkg/b.go");
    alive.visibility = Visibility::Private;
    for e in [&dead_private, &suspicious, &caller, &alive] {
        store.create_entity(e).unwrap();
    }
    link(&store, &dead_private, &suspicious, DepType::Calls);
    link(&store, &caller, &alive, DepType::Calls);

    let graph = DepGraph::build_from_store(&store).unwrap();
    let config = CxConfig::default();
    let analyzer = DeadCodeAnalyzer::new(&store, &graph, &config);

    // Tier 1: only the private orphan.
    let tier1 = analyzer.analyze(&DeadRequest::new(1)).unwrap();
    let ids: Vec<&str> = tier1.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![dead_private.id.as_str()]);

    // Tier 3 without exports: the private seed propagates.
    let tier3 = analyzer.analyze(&DeadRequest::new(3)).unwrap();
    let ids: Vec<&str> = tier3.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&dead_private.id.as_str()));
    assert!(ids.contains(&suspicious.id.as_str()));

    // Tier 3 with exports: caller is probable, alive becomes suspicious;
    // chains split into {deadPrivate, suspicious} and {caller, alive}.
    let mut request = DeadRequest::new(3);
    request.include_exports = true;
    request.chains = true;
    let full = analyzer.analyze(&request).unwrap();
    assert_eq!(full.results.len(), 4);
    assert_eq!(full.chain_count, 2);

    let chain_of = |id: &str| full.results.iter().find(|r| r.id == id).unwrap().chain;
    assert_eq!(chain_of(&dead_private.id), chain_of(&suspicious.id));
    assert_eq!(chain_of(&caller.id), chain_of(&alive.id));
    assert_ne!(chain_of(&dead_private.id), chain_of(&caller.id));

    // Re-running finds nothing new: the pass is a fixpoint.
    let again = analyzer.analyze(&request).unwrap();
    assert_eq!(again.results.len(), full.results.len());
}

/// Impact of a leaf utility: low risk, test command lists its packages.
#[test]
fn scenario_impact_risk() {
    let store = SqliteStore::open_in_memory().unwrap();
    let parse = seed(&store, "Parse", "internal/parse.go");
    let compile = seed(&store, "Compile", "internal/compile.go");
    let main = seed(&store, "Main", "cmd/main.go");
    link(&store, &compile, &parse, DepType::Calls);
    link(&store, &main, &compile, DepType::Calls);

    let graph = DepGraph::build_from_store(&store).unwrap();
    let config = CxConfig::default();
    let mut request = ImpactRequest::new(parse.id.clone());
    request.depth = 2;

    let result = ImpactAnalyzer::new(&store, &graph, &config)
        .analyze(&request)
        .unwrap();

    let by_id = |id: &str| result.affected.iter().find(|a| a.id == id);
    assert_eq!(by_id(&compile.id).unwrap().hop, 1);
    assert_eq!(by_id(&main.id).unwrap().hop, 2);
    assert_eq!(result.risk_level.as_str(), "low");
    assert!(result.suggested_tests.contains("./internal/..."));
}

/// Commit, mutate, hard-reset: the digest counts roll back too.
#[test]
fn scenario_rollback() {
    let store = SqliteStore::open_in_memory().unwrap();
    seed(&store, "Base", "pkg/base.go");
    let s0 = store.commit("s0").unwrap();

    let x = seed(&store, "X", "pkg/x.go");
    store.commit("s1").unwrap();
    assert!(store.get_entity(&x.id).is_ok());

    store.reset(&s0, ResetMode::Hard).unwrap();
    assert!(store.get_entity(&x.id).unwrap_err().is_not_found());

    let text = digest(&store, None, false).unwrap();
    assert!(text.contains("Active entities: 1"));
}

/// Smart context: keyword intent selects matching keystones.
#[test]
fn scenario_smart_context() {
    let store = SqliteStore::open_in_memory().unwrap();
    let limiter = seed(&store, "RateLimiter", "pkg/limit.go");
    let register = seed(&store, "RegisterRoutes", "pkg/routes.go");
    let helper = seed(&store, "helper", "pkg/util.go");
    link(&store, &limiter, &helper, DepType::Calls);

    // Computed metrics make the two hubs keystones in this tiny graph.
    let graph = DepGraph::build_from_store(&store).unwrap();
    let metrics = compute_all(&graph, &MetricsOptions::default(), &CancelToken::new()).unwrap();
    store.save_bulk_metrics(&metrics).unwrap();
    store
        .save_metrics(&EntityMetrics {
            page_rank: 0.6,
            ..EntityMetrics::zero(&limiter.id)
        })
        .unwrap();
    store
        .save_metrics(&EntityMetrics {
            page_rank: 0.5,
            ..EntityMetrics::zero(&register.id)
        })
        .unwrap();

    let config = CxConfig::default();
    let mut request = SmartContextRequest::new("add rate limiting to API endpoints");
    request.max_tokens = 8000;

    let pack = ContextAssembler::new(&store, &graph, &config)
        .assemble_smart(&request)
        .unwrap();

    let intent = pack.intent.as_ref().unwrap();
    for expected in ["rate", "limiting", "api"] {
        assert!(
            intent.keywords.iter().any(|k| k == expected),
            "missing keyword {expected}: {:?}",
            intent.keywords
        );
    }
    assert_eq!(intent.pattern.as_deref(), Some("add-feature"));

    // The rate limiter matches "rate"; RegisterRoutes matches nothing.
    assert!(pack.entry_points.iter().any(|e| e.id == limiter.id));
    assert!(!pack.entry_points.iter().any(|e| e.id == register.id));
    // Its dependency arrives through BFS.
    assert!(pack.relevant.iter().any(|e| e.id == helper.id));
}

/// Boundary: empty graph yields no metrics and NotFound for any target.
#[test]
fn scenario_empty_graph() {
    let store = SqliteStore::open_in_memory().unwrap();
    let graph = DepGraph::build_from_store(&store).unwrap();
    assert!(graph.is_empty());

    let metrics = compute_all(&graph, &MetricsOptions::default(), &CancelToken::new()).unwrap();
    assert!(metrics.is_empty());

    let config = CxConfig::default();
    let err = ContextAssembler::new(&store, &graph, &config)
        .assemble(&ContextRequest::new("pkg/anything.go"))
        .unwrap_err();
    assert!(err.to_string().contains("not found"));
}

/// Metrics invariant: in-degree equals the number of distinct callers.
#[test]
fn scenario_in_degree_matches_distinct_callers() {
    let store = SqliteStore::open_in_memory().unwrap();
    let hub = seed(&store, "Hub", "pkg/hub.go");
    let a = seed(&store, "A", "pkg/a.go");
    let b = seed(&store, "B", "pkg/b.go");
    link(&store, &a, &hub, DepType::Calls);
    link(&store, &a, &hub, DepType::UsesType);
    link(&store, &b, &hub, DepType::Calls);
    link(&store, &hub, &hub, DepType::Calls);

    let graph = DepGraph::build_from_store(&store).unwrap();
    let metrics = compute_all(&graph, &MetricsOptions::default(), &CancelToken::new()).unwrap();
    let hub_metrics = metrics.iter().find(|m| m.entity_id == hub.id).unwrap();
    assert_eq!(hub_metrics.in_degree, 2);
}
