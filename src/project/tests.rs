use super::*;
use crate::compute::engine::Location;
use crate::compute::linker::HydVar;
use crate::store::{ExprClass, ExprKind, Insertion, MassUnits, MixModel, SourceKind};
use rayon::prelude::*;
use rstest::rstest;

fn open_project() -> Project {
    let mut p = Project::new();
    p.open_empty().unwrap();
    p
}

/// J1 -- P1 -- J2 -- P2 -- T1, with bulk species S1 and S2.
fn small_network() -> Project {
    let mut p = open_project();
    p.add_node("J1").unwrap();
    p.add_node("J2").unwrap();
    p.add_tank("T1", 100.0, MixModel::Mix1, 0.0).unwrap();
    p.add_link("P1", "J1", "J2", 100.0, 12.0, 100.0).unwrap();
    p.add_link("P2", "J2", "T1", 50.0, 8.0, 100.0).unwrap();
    p.add_species("S1", SpeciesKind::Bulk, MassUnits::Mg, 0.01, 0.001).unwrap();
    p.add_species("S2", SpeciesKind::Bulk, MassUnits::Mg, 0.01, 0.001).unwrap();
    p
}

// --- Lifecycle ---

#[test]
fn test_close_is_idempotent() {
    let mut p = small_network();
    p.close();
    p.close();
    assert_eq!(p.state(), ProjectState::Closed);
    assert!(p.symbols().is_empty());
    assert_eq!(p.registry().count(ObjectType::Node), 0);

    // A closed project can be opened again.
    p.open_empty().unwrap();
    assert_eq!(p.get_count(ObjectType::Species).unwrap(), 0);
}

#[test]
fn test_state_errors() {
    let mut p = Project::new();
    assert_eq!(p.add_node("J1").unwrap_err().code(), 519);
    assert_eq!(p.get_count(ObjectType::Node).unwrap_err().code(), 519);

    p.open_empty().unwrap();
    assert_eq!(p.open_empty().unwrap_err().code(), 520);

    // A held quality axis freezes structure but keeps reads and value setters.
    p.add_node("J1").unwrap();
    p.close_quality();
    assert_eq!(p.add_node("J2").unwrap_err().code(), 519);
    assert_eq!(p.get_count(ObjectType::Node).unwrap(), 1);
    p.open_quality().unwrap();
    p.add_node("J2").unwrap();
}

// --- Symbols and counts ---

#[rstest]
#[case(ObjectType::Node, "N1")]
#[case(ObjectType::Species, "CL2")]
#[case(ObjectType::Parameter, "Kb")]
#[case(ObjectType::Constant, "K1")]
#[case(ObjectType::Term, "Decay")]
#[case(ObjectType::Pattern, "Daily")]
fn test_find_and_count_track_adds(#[case] ty: ObjectType, #[case] id: &str) {
    let mut p = open_project();
    let before = p.registry().count(ty);
    let index = match ty {
        ObjectType::Node => p.add_node(id),
        ObjectType::Species => p.add_species(id, SpeciesKind::Bulk, MassUnits::Mg, 0.0, 0.0),
        ObjectType::Parameter | ObjectType::Constant => p.add_coefficient(ty, id, 1.0),
        ObjectType::Term => p.add_term(id, "1 + 1"),
        _ => p.add_pattern(id),
    }
    .unwrap();

    assert_eq!(p.find_object(ty, id), Some(index));
    assert_eq!(p.find_id(ty, index), Some(id));
    assert_eq!(p.registry().count(ty), before + 1);
}

#[rstest]
#[case("")]
#[case("has space")]
#[case("semi;colon")]
#[case("abcdefghijklmnopqrstuvwxyz0123456")]
fn test_bad_ids_rejected(#[case] id: &str) {
    let mut p = open_project();
    assert_eq!(p.add_node(id).unwrap_err().code(), 518);
    assert_eq!(p.get_count(ObjectType::Node).unwrap(), 0);
}

#[test]
fn test_duplicates_leave_state_unchanged() {
    let mut p = small_network();
    let arena = p.symbols().arena_len();

    assert_eq!(p.add_node("J1").unwrap_err().code(), 518);
    // A tank name is also a node name.
    assert_eq!(p.add_tank("J2", 1.0, MixModel::Mix1, 0.0).unwrap_err().code(), 518);
    assert_eq!(p.add_species("S1", SpeciesKind::Wall, MassUnits::Ug, 0.0, 0.0).unwrap_err().code(), 518);

    assert_eq!(p.get_count(ObjectType::Node).unwrap(), 3);
    assert_eq!(p.get_count(ObjectType::Tank).unwrap(), 1);
    assert_eq!(p.get_count(ObjectType::Species).unwrap(), 2);
    assert_eq!(p.find_object(ObjectType::Node, "J1"), Some(1));
    assert_eq!(p.symbols().arena_len(), arena);
}

#[test]
fn test_reserved_names_rejected_for_chemistry() {
    let mut p = open_project();
    assert_eq!(p.add_species("Re", SpeciesKind::Bulk, MassUnits::Mg, 0.0, 0.0).unwrap_err().code(), 206);
    assert_eq!(p.add_coefficient(ObjectType::Constant, "kc", 1.0).unwrap_err().code(), 206);
    // Network objects may use them.
    p.add_node("Re").unwrap();
}

#[test]
fn test_add_link_with_unknown_endpoint_registers_nothing() {
    let mut p = small_network();
    assert_eq!(p.add_link("P3", "J1", "NOWHERE", 1.0, 1.0, 1.0).unwrap_err().code(), 205);
    assert_eq!(p.find_object(ObjectType::Link, "P3"), None);
    p.add_link("P3", "J1", "T1", 1.0, 1.0, 1.0).unwrap();
    assert_eq!(p.get_index(ObjectType::Link, "P3").unwrap(), 3);
}

#[test]
fn test_add_object_name_is_claimed_by_next_add() {
    let mut p = open_project();
    assert_eq!(p.add_object(ObjectType::Node, "J1").unwrap(), Insertion::Inserted(1));
    assert_eq!(p.add_object(ObjectType::Node, "J1").unwrap(), Insertion::Duplicate);

    // Registered but not yet an object.
    assert_eq!(p.find_object(ObjectType::Node, "J1"), Some(1));
    assert_eq!(p.get_index(ObjectType::Node, "J1").unwrap_err().code(), 517);

    assert_eq!(p.add_node("J1").unwrap(), 1);
    assert_eq!(p.get_index(ObjectType::Node, "J1").unwrap(), 1);
    assert_eq!(p.symbols().len(ObjectType::Node), 1);

    // A new name may not jump ahead of one still waiting for its object.
    p.add_object(ObjectType::Node, "J2").unwrap();
    assert_eq!(p.add_node("J3").unwrap_err().code(), 518);
    assert_eq!(p.add_node("J2").unwrap(), 2);
}

#[test]
fn test_get_id_and_lookup_errors() {
    let mut p = small_network();
    p.add_coefficient(ObjectType::Constant, "Kc1", 2.0).unwrap();

    assert_eq!(p.get_id(ObjectType::Species, 2).unwrap(), "S2");
    assert_eq!(p.get_id_len(ObjectType::Constant, 1).unwrap(), 3);
    assert_eq!(p.get_id(ObjectType::Species, 3).unwrap_err().code(), 516);
    assert_eq!(p.get_id(ObjectType::Node, 1).unwrap_err().code(), 515);
    assert_eq!(p.get_index(ObjectType::Tank, "T1").unwrap_err().code(), 515);
    assert_eq!(p.get_index(ObjectType::Species, "S9").unwrap_err().code(), 517);
    assert_eq!(p.get_count(ObjectType::Tank).unwrap(), 1);
}

// --- Fan-out and relinking ---

#[test]
fn test_species_fan_out_to_every_entity() {
    let p = small_network();
    let reg = p.registry();
    let width = reg.count(ObjectType::Species) + 1;
    for n in &reg.nodes {
        assert_eq!(n.c.len(), width);
        assert_eq!(n.c0.len(), width);
        assert!(n.c.iter().all(|&v| v == 0.0));
    }
    for l in &reg.links {
        assert_eq!(l.c0.len(), width);
        assert_eq!(l.c.len(), width);
        assert_eq!(l.reacted.len(), width);
    }
    for t in &reg.tanks {
        assert_eq!(t.c.len(), width);
        assert_eq!(t.reacted.len(), width);
    }
    assert_eq!(reg.c0.len(), width);
}

#[test]
fn test_parameter_fan_out() {
    let mut p = small_network();
    p.add_coefficient(ObjectType::Parameter, "Kb", 0.5).unwrap();
    p.add_coefficient(ObjectType::Parameter, "Kw", 0.7).unwrap();
    let width = p.registry().count(ObjectType::Parameter) + 1;
    assert!(p.registry().links.iter().all(|l| l.param.len() == width));
    assert!(p.registry().tanks.iter().all(|t| t.param.len() == width));
}

#[test]
fn test_term_value_survives_new_term() {
    let mut p = small_network();
    let conc = [0.0, 1.5, 2.0];
    let t1 = p.add_term("T1", "S1 + S2").unwrap();
    let before = p.evaluate_term(t1, &conc).unwrap();

    let t2 = p.add_term("T2", "T1 * 2").unwrap();
    assert_eq!(p.evaluate_term(t1, &conc).unwrap(), before);
    assert_eq!(p.evaluate_term(t2, &conc).unwrap(), 2.0 * before);
}

#[test]
fn test_coefficient_codes_shift_with_new_objects() {
    let mut p = small_network();
    p.add_coefficient(ObjectType::Parameter, "K", 3.0).unwrap();
    p.add_coefficient(ObjectType::Constant, "C", 10.0).unwrap();
    let t = p.add_term("T1", "K * S2 + C + Len").unwrap();
    let conc = [0.0, 1.0, 2.0];
    assert_eq!(p.evaluate_term(t, &conc).unwrap(), 16.0);

    // Each add shifts codes below the constant and hydraulic ranges.
    p.add_term("T2", "T1 - C").unwrap();
    p.add_coefficient(ObjectType::Parameter, "K2", 100.0).unwrap();
    p.add_species("S3", SpeciesKind::Wall, MassUnits::Mg, 0.0, 0.0).unwrap();

    let conc = [0.0, 1.0, 2.0, 50.0];
    assert_eq!(p.evaluate_term(t, &conc).unwrap(), 16.0);
    assert_eq!(p.evaluate_term(2, &conc).unwrap(), 6.0);
}

#[test]
fn test_failed_term_registers_nothing() {
    let mut p = small_network();
    assert_eq!(p.add_term("Bad", "S1 + Unknown").unwrap_err().code(), 209);
    assert_eq!(p.add_term("Bad", "S1 / 0").unwrap_err().code(), 209);
    assert_eq!(p.find_object(ObjectType::Term, "Bad"), None);
    assert_eq!(p.add_term("Bad", "S1 / 2").unwrap(), 1);
}

#[test]
fn test_expression_rules() {
    let mut p = small_network();
    p.add_expression(ObjectType::Link, ExprKind::Rate, "S1", "-0.1 * S1").unwrap();
    assert_eq!(
        p.add_expression(ObjectType::Link, ExprKind::Rate, "S1", "S1").unwrap_err().code(),
        208
    );
    assert_eq!(p.add_expression(ObjectType::Link, ExprKind::None, "S2", "S2").unwrap_err().code(), 203);
    assert_eq!(p.add_expression(ObjectType::Node, ExprKind::Rate, "S2", "S2").unwrap_err().code(), 518);
    assert_eq!(p.add_expression(ObjectType::Link, ExprKind::Rate, "S9", "S2").unwrap_err().code(), 205);
}

// --- Patterns and sources ---

#[test]
fn test_pattern_round_trip() {
    let mut p = open_project();
    let pat = p.add_pattern("Daily").unwrap();
    p.set_pattern(pat, &[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(p.get_pattern_len(pat).unwrap(), 3);

    let values: Vec<f64> = (1..=4).map(|k| p.get_pattern_value(pat, k).unwrap()).collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0, 0.0]);

    p.set_pattern_value(pat, 2, 5.0).unwrap();
    assert_eq!(p.get_pattern_value(pat, 2).unwrap(), 5.0);
    assert_eq!(p.set_pattern_value(pat, 4, 1.0).unwrap_err().code(), 518);
    assert_eq!(p.get_pattern_len(2).unwrap_err().code(), 516);
}

#[test]
fn test_single_source_record_per_species() {
    let mut p = small_network();
    p.set_source(1, 1, SourceKind::Concentration, 1.0, 0).unwrap();
    p.set_source(1, 1, SourceKind::Mass, 4.0, 0).unwrap();

    let node = p.registry().node(1).unwrap();
    assert_eq!(node.sources.len(), 1);
    let s = p.get_source(1, 1).unwrap().unwrap();
    assert_eq!((s.kind, s.c0), (SourceKind::Mass, 4.0));
    assert_eq!(p.get_source(1, 2).unwrap(), None);
}

#[test]
fn test_source_validation() {
    let mut p = small_network();
    p.add_species("W", SpeciesKind::Wall, MassUnits::Mg, 0.0, 0.0).unwrap();

    assert_eq!(p.set_source(9, 1, SourceKind::Mass, 1.0, 0).unwrap_err().code(), 516);
    assert_eq!(p.set_source(1, 1, SourceKind::Mass, 1.0, 1).unwrap_err().code(), 516);
    assert_eq!(p.set_source(1, 1, SourceKind::Mass, -1.0, 0).unwrap_err().code(), 518);
    assert_eq!(p.set_source(1, 3, SourceKind::Mass, 1.0, 0).unwrap_err().code(), 518);

    // By-ID adds ignore wall species without failing.
    p.add_source(SourceKind::Setpoint, "J1", "W", 1.0, None).unwrap();
    assert!(p.registry().node(1).unwrap().sources.is_empty());
    assert_eq!(p.add_source(SourceKind::Setpoint, "J1", "S1", 1.0, Some("Nope")).unwrap_err().code(), 205);
}

// --- Quality, parameters and reporting ---

#[test]
fn test_add_quality_scopes() {
    let mut p = small_network();
    p.add_species("W", SpeciesKind::Wall, MassUnits::Mg, 0.0, 0.0).unwrap();

    p.add_quality("GLOBAL", "W", 2.0, "").unwrap();
    assert_eq!(p.get_init_qual(ObjectType::Node, 1, 3).unwrap(), 0.0);
    assert_eq!(p.get_init_qual(ObjectType::Link, 2, 3).unwrap(), 2.0);
    assert_eq!(p.registry().c0[3], 2.0);

    p.add_quality("node", "S1", 1.5, "J2").unwrap();
    p.add_quality("LINK", "S2", 0.25, "P1").unwrap();
    assert_eq!(p.get_init_qual(ObjectType::Node, 2, 1).unwrap(), 1.5);
    assert_eq!(p.get_init_qual(ObjectType::Link, 1, 2).unwrap(), 0.25);

    assert_eq!(p.add_quality("PIPE", "S1", 1.0, "P1").unwrap_err().code(), 203);
    assert_eq!(p.add_quality("NODE", "S1", 1.0, "J9").unwrap_err().code(), 205);
    assert_eq!(p.add_quality("NODE", "S9", 1.0, "J1").unwrap_err().code(), 205);
}

#[test]
fn test_local_parameters() {
    let mut p = small_network();
    p.add_coefficient(ObjectType::Parameter, "Kb", 0.1).unwrap();
    p.add_parameter("PIPE", "Kb", 0.5, "P2").unwrap();
    p.add_parameter("TANK", "Kb", 0.8, "T1").unwrap();

    assert_eq!(p.get_parameter(ObjectType::Link, 2, 1).unwrap(), 0.5);
    // Node 3 is the tank's node.
    assert_eq!(p.get_parameter(ObjectType::Node, 3, 1).unwrap(), 0.8);
    assert_eq!(p.get_parameter(ObjectType::Node, 1, 1).unwrap(), 0.0);

    p.set_parameter(ObjectType::Link, 1, 1, 0.3).unwrap();
    assert_eq!(p.get_parameter(ObjectType::Link, 1, 1).unwrap(), 0.3);
    assert_eq!(p.get_parameter(ObjectType::Link, 1, 2).unwrap_err().code(), 516);
    assert_eq!(p.get_parameter(ObjectType::Species, 1, 1).unwrap_err().code(), 515);
    assert_eq!(p.add_parameter("PIPE", "Kx", 1.0, "P1").unwrap_err().code(), 205);
    assert_eq!(p.add_parameter("NODE", "Kb", 1.0, "J1").unwrap_err().code(), 203);
}

#[test]
fn test_report_settings() {
    let mut p = small_network();
    p.set_report("NODE", "J2", 0).unwrap();
    p.set_report("SPECIES", "S1", 4).unwrap();
    p.set_report("FILE", "out.rpt", 0).unwrap();
    p.set_report("PAGESIZE", "60", 0).unwrap();

    assert!(p.registry().node(2).unwrap().rpt);
    assert_eq!(p.get_species(1).unwrap().precision, 4);
    assert_eq!(p.options().report_file, "out.rpt");
    assert_eq!(p.options().page_size, 60);
    assert_eq!(p.set_report("PAGESIZE", "many", 0).unwrap_err().code(), 204);
    assert_eq!(p.set_report("PAGESIZE", "60.5", 0).unwrap_err().code(), 204);
    assert_eq!(p.set_report("PAGESIZE", "1e12", 0).unwrap_err().code(), 204);
    assert_eq!(p.options().page_size, 60);
    assert_eq!(p.set_report("COLOR", "x", 0).unwrap_err().code(), 203);
}

#[test]
fn test_quality_reads_follow_tanks() {
    let mut p = small_network();
    p.set_quality(ObjectType::Node, 3, 1, 7.0).unwrap();
    p.set_quality(ObjectType::Link, 1, 2, 3.0).unwrap();
    assert_eq!(p.get_quality_by_index(ObjectType::Node, 3, 1).unwrap(), 7.0);
    assert_eq!(p.get_quality_by_id(ObjectType::Node, "T1", "S1").unwrap(), 7.0);
    assert_eq!(p.get_quality_by_id(ObjectType::Link, "P1", "S2").unwrap(), 3.0);
    assert_eq!(p.get_quality_by_id(ObjectType::Link, "P9", "S2").unwrap_err().code(), 517);

    p.set_init_qual(ObjectType::Node, 1, 2, 0.4).unwrap();
    assert_eq!(p.get_init_qual(ObjectType::Node, 1, 2).unwrap(), 0.4);
}

#[test]
fn test_hydraulics_shift_to_one_based() {
    let mut p = small_network();
    p.set_hydraulics(&[1.0, 2.0, 3.0], &[10.0, 20.0, 30.0], &[5.0, -5.0]).unwrap();
    assert_eq!(p.registry().demand, vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(p.registry().flow, vec![0.0, 5.0, -5.0]);
    assert_eq!(p.set_hydraulics(&[1.0], &[1.0], &[1.0]).unwrap_err().code(), 518);
}

// --- Init and conversion ---

#[test]
fn test_init_aliases_tank_and_converts_once() {
    let mut p = small_network();
    p.add_expression(ObjectType::Link, ExprKind::Rate, "S1", "-0.5 * S1").unwrap();
    p.add_expression(ObjectType::Link, ExprKind::Rate, "S2", "0").unwrap();
    p.add_expression(ObjectType::Tank, ExprKind::Rate, "S2", "-S2").unwrap();

    p.init().unwrap();
    assert!(p.is_initialized());
    assert_eq!(p.conversion_passes(), 1);
    assert!(matches!(p.registry().species_at(1).unwrap().tank, ExprBinding::Alias { species: 1, .. }));

    let conc = [0.0, 2.0, 3.0];
    let hyd = [0.0; HydVar::COUNT];
    let rate = p.evaluate_expression(1, ExprClass::Tank, Location::Tank(1), &conc, &hyd).unwrap();
    assert_eq!(rate, -1.0);

    p.init().unwrap();
    assert_eq!(p.conversion_passes(), 1);
}

#[test]
fn test_init_reports_missing_pipe_expression() {
    let mut p = small_network();
    p.add_expression(ObjectType::Link, ExprKind::Rate, "S1", "-S1").unwrap();
    let err = p.init().unwrap_err();
    assert_eq!(err.code(), 507);
    assert!(!p.is_initialized());
}

#[test]
fn test_init_reports_circular_term() {
    let mut p = small_network();
    p.add_object(ObjectType::Term, "T1").unwrap();
    p.add_term("T1", "T1 + 1").unwrap();
    p.add_expression(ObjectType::Link, ExprKind::Rate, "S1", "T1").unwrap();
    p.add_expression(ObjectType::Link, ExprKind::Rate, "S2", "T1").unwrap();
    assert_eq!(p.init().unwrap_err().code(), 209);
}

#[test]
fn test_adjacency_tracks_topology() {
    let mut p = small_network();
    assert_eq!(p.adjacency().unwrap().entry_count(), 4);
    p.add_node("J3").unwrap();
    p.add_link("P3", "J3", "J1", 1.0, 1.0, 1.0).unwrap();
    let adj = p.adjacency().unwrap();
    assert_eq!(adj.node_count(), 4);
    assert_eq!(adj.entry_count(), 6);
}

#[test]
fn test_sort_nodes_follows_flow() {
    let mut p = small_network();
    p.set_hydraulics(&[0.0; 3], &[0.0; 3], &[-1.0, -1.0]).unwrap();
    assert_eq!(p.sort_nodes().unwrap(), vec![3, 2, 1]);
}

#[test]
fn test_diagnostics_render_compiled_state() {
    let mut p = small_network();
    p.add_coefficient(ObjectType::Parameter, "Kb", 0.2).unwrap();
    p.add_term("Decay", "Kb * S1").unwrap();
    p.add_expression(ObjectType::Link, ExprKind::Rate, "S1", "-Decay").unwrap();
    // Adding a species afterwards must not change the rendered text.
    p.add_species("S3", SpeciesKind::Wall, MassUnits::Mg, 0.0, 0.0).unwrap();

    assert_eq!(p.get_expression_text(1, ExprClass::Pipe).unwrap().as_deref(), Some("-Decay"));
    assert_eq!(p.get_expression_text(2, ExprClass::Pipe).unwrap(), None);

    let trace = p.term_trace(1).unwrap();
    assert!(trace.contains("[L1] Decay = Kb * S1"));
    assert!(trace.contains("-> Parameter [0.200]"));

    let report = p.telemetry();
    assert_eq!(report.count(ObjectType::Species), 3);
    assert_eq!(report.expressions, 2);
}

#[test]
fn test_species_trace_labels_by_kind() {
    let mut p = small_network();
    p.add_expression(ObjectType::Link, ExprKind::Rate, "S1", "-0.1 * S1").unwrap();
    p.add_expression(ObjectType::Link, ExprKind::Formula, "S2", "2 * S1").unwrap();
    p.add_expression(ObjectType::Tank, ExprKind::Equil, "S1", "S1 - S2").unwrap();

    assert!(p.species_trace(1, ExprClass::Pipe).unwrap().contains("[L1] dS1/dt = -0.1 * S1"));
    assert!(p.species_trace(2, ExprClass::Pipe).unwrap().contains("[L1] S2 = 2 * S1"));
    assert!(p.species_trace(1, ExprClass::Tank).unwrap().contains("[L1] 0 = S1 - S2"));
    assert!(p.species_trace(2, ExprClass::Tank).unwrap().starts_with("Error: No Tank expression"));
    assert_eq!(p.species_trace(3, ExprClass::Pipe).unwrap_err().code(), 516);
}

// --- Allocation failure ---

/// Claims table sizes no allocator can satisfy.
struct OversizedLoader;

impl NetworkLoader for OversizedLoader {
    fn counts(&self) -> [usize; ObjectType::COUNT] {
        [usize::MAX / 2; ObjectType::COUNT]
    }

    fn read_network(&self, project: &mut Project) -> Result<()> {
        project.add_node("J1").map(|_| ())
    }

    fn read_chemistry(&self, _project: &mut Project) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_open_with_oversized_counts_is_out_of_memory() {
    let mut p = Project::new();
    assert_eq!(p.open(&OversizedLoader).unwrap_err().code(), 501);
    assert_eq!(p.state(), ProjectState::Closed);
    assert_eq!(p.registry().count(ObjectType::Node), 0);

    p.close();
    p.close();
    p.open_empty().unwrap();
    assert_eq!(p.add_node("J1").unwrap(), 1);
}

#[test]
fn test_failed_reservation_changes_nothing() {
    let mut p = small_network();
    let arena = p.symbols().arena_len();

    let err = MsxError::from(p.symbols.try_reserve(ObjectType::Node, usize::MAX / 2).unwrap_err());
    assert_eq!(err.code(), 501);
    let mut counts = [0; ObjectType::COUNT];
    counts[ObjectType::Species.index()] = usize::MAX / 2;
    assert_eq!(p.registry.reserve_counts(&counts).unwrap_err().code(), 501);

    assert_eq!(p.get_count(ObjectType::Node).unwrap(), 3);
    assert_eq!(p.get_count(ObjectType::Species).unwrap(), 2);
    assert_eq!(p.find_object(ObjectType::Node, "J2"), Some(2));
    assert_eq!(p.find_object(ObjectType::Species, "S2"), Some(2));
    assert_eq!(p.symbols().arena_len(), arena);
    assert_eq!(p.registry().nodes.iter().map(|n| n.c.len()).max(), Some(3));

    // The project stays usable.
    assert_eq!(p.add_node("J3").unwrap(), 4);
    assert_eq!(p.add_species("S3", SpeciesKind::Bulk, MassUnits::Mg, 0.0, 0.0).unwrap(), 3);
}

// --- Independence ---

#[test]
fn test_projects_build_in_parallel() {
    let totals: Vec<usize> = (0..8usize)
        .into_par_iter()
        .map(|k| {
            let mut p = open_project();
            for i in 0..=k {
                p.add_node(&format!("N{}", i)).unwrap();
            }
            p.add_species("S", SpeciesKind::Bulk, MassUnits::Mg, 0.0, 0.0).unwrap();
            p.get_count(ObjectType::Node).unwrap()
        })
        .collect();
    assert_eq!(totals, (1..=8).collect::<Vec<_>>());
}
