//! Diagram synchronization integration tests

mod common;

use common::{fixture, RecordingNotifier, LAYOUT, LOCAL};
use conceptual_model_editor::{
    Aggregator, Color, ConnectionContext, ConnectionRequest, Diagram, DiagramGesture, DiagramSynchronizer,
    EdgeKind, EntityModel, InMemorySemanticModel, InMemoryVisualModel, LanguageString, ModelError, Operation, Position,
    ReadOnlyVisualModel, RelationshipEnd, SyncSettings, SyncState, VisualEntityChange,
    VisualEntityUpdate, VisualModel, VisualModelListener, VisualNodeSpec,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn active_synchronizer(fixture: &common::Fixture) -> DiagramSynchronizer {
    let view = fixture.aggregator.view();
    let mut synchronizer = DiagramSynchronizer::new(view.clone(), SyncSettings::default());
    view.change_active_visual_model(Some(LAYOUT)).unwrap();
    synchronizer.process_pending();
    synchronizer
}

#[derive(Default)]
struct CountingListener {
    entity_batches: AtomicUsize,
}

impl VisualModelListener for CountingListener {
    fn visual_entities_did_change(&self, _changes: &[VisualEntityChange]) {
        self.entity_batches.fetch_add(1, Ordering::SeqCst);
    }

    fn model_color_did_change(&self, _model_id: &str, _color: Option<Color>) {}
}

#[test]
fn test_activation_builds_diagram() {
    let fixture = fixture();
    let view = fixture.aggregator.view();
    let mut synchronizer = DiagramSynchronizer::new(view.clone(), SyncSettings::default());
    assert_eq!(synchronizer.state(), SyncState::Uninitialized);
    assert!(synchronizer.diagram().nodes.is_empty());

    view.change_active_visual_model(Some(LAYOUT)).unwrap();
    synchronizer.process_pending();
    assert_eq!(synchronizer.state(), SyncState::Loaded);

    let diagram = synchronizer.diagram();
    assert_eq!(diagram.nodes.len(), 3);
    assert_eq!(diagram.edges.len(), 2);

    let person = diagram.node("person").unwrap();
    assert_eq!(person.data.label, "Person");
    assert_eq!(person.data.color, "#ffffff");
    assert_eq!(person.data.model, LOCAL);

    let lives_at = diagram.edge("lives-at").unwrap();
    assert_eq!((lives_at.source.as_str(), lives_at.target.as_str()), ("person", "address"));
    assert_eq!(lives_at.data.kind, EdgeKind::Relationship);
    assert_eq!(lives_at.data.label, "lives at");
    assert_eq!(lives_at.data.target_cardinality.as_deref(), Some("0..*"));

    let generalization = diagram.edge("employee-is-person").unwrap();
    assert_eq!(generalization.data.kind, EdgeKind::Generalization);
    assert_eq!(
        (generalization.source.as_str(), generalization.target.as_str()),
        ("employee", "person")
    );
}

#[test]
fn test_attribute_attaches_to_its_class() {
    let fixture = fixture();
    let mut synchronizer = active_synchronizer(&fixture);

    let diagram = synchronizer.diagram();
    let attributes = &diagram.node("person").unwrap().data.attributes;
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes[0].id, "age");
    assert_eq!(attributes[0].datatype.as_deref(), Some("xsd:integer"));
    assert_eq!(attributes[0].cardinality.as_deref(), Some("1..1"));
    // Attributes are never drawn as edges
    assert!(diagram.edge("age").is_none());

    // Moving the attribute to another class regenerates both nodes
    fixture
        .local
        .execute_operation(Operation::ModifyRelationship {
            id: "age".to_string(),
            iri: None,
            name: None,
            description: None,
            ends: Some([
                RelationshipEnd::source("address"),
                RelationshipEnd::target("xsd:integer", "http://example.com/age"),
            ]),
        })
        .unwrap();
    synchronizer.process_pending();

    let diagram = synchronizer.diagram();
    assert!(diagram.node("person").unwrap().data.attributes.is_empty());
    assert_eq!(diagram.node("address").unwrap().data.attributes[0].id, "age");

    fixture.local.execute_operation(Operation::delete("age")).unwrap();
    synchronizer.process_pending();
    assert!(synchronizer.diagram().node("address").unwrap().data.attributes.is_empty());
}

#[test]
fn test_full_reset_is_idempotent() {
    let fixture = fixture();
    let mut synchronizer = active_synchronizer(&fixture);

    synchronizer.full_reset();
    let first = synchronizer.diagram();
    synchronizer.full_reset();
    assert_eq!(synchronizer.diagram(), first);

    // A second view on the same aggregator derives the same diagram
    let other = active_synchronizer(&fixture);
    assert_eq!(other.diagram(), first);
}

#[test]
fn test_dangling_references_are_skipped() {
    let fixture = fixture();
    fixture
        .layout
        .add_visual_node(VisualNodeSpec::new(LOCAL, "ghost", Position::new(5.0, 5.0)))
        .unwrap();
    let address = fixture.layout.visual_node_for_represented("address").unwrap();
    fixture.layout.delete_visual_entity(&address.identifier).unwrap();

    let mut synchronizer = active_synchronizer(&fixture);
    let diagram = synchronizer.diagram();
    assert!(diagram.node("ghost").is_none());
    // The relationship has no target node to attach to
    assert!(diagram.edge("lives-at").is_none());
    assert_eq!(diagram.nodes.len(), 2);

    // Showing the address brings the waiting edge along
    synchronizer
        .add_to_view("address", Position::new(300.0, 0.0))
        .unwrap();
    let diagram = synchronizer.diagram();
    assert!(diagram.node("address").is_some());
    assert!(diagram.edge("lives-at").is_some());
}

#[test]
fn test_drag_writes_position_once() {
    let fixture = fixture();
    let mut synchronizer = active_synchronizer(&fixture);
    let listener = Arc::new(CountingListener::default());
    let subscription = fixture.layout.subscribe_to_changes(listener.clone());

    let target = Position::new(40.0, 60.0);
    synchronizer
        .handle_gesture(DiagramGesture::NodeDragStop {
            node: "person".to_string(),
            position: target,
        })
        .unwrap();
    assert_eq!(listener.entity_batches.load(Ordering::SeqCst), 1);
    assert_eq!(
        fixture.layout.visual_node_for_represented("person").unwrap().position,
        target
    );
    assert_eq!(synchronizer.diagram().node("person").unwrap().position, target);

    // Dropping where it already is writes nothing
    synchronizer
        .handle_gesture(DiagramGesture::NodeDragStop {
            node: "person".to_string(),
            position: target,
        })
        .unwrap();
    assert_eq!(listener.entity_batches.load(Ordering::SeqCst), 1);
    subscription.unsubscribe();
}

#[test]
fn test_drag_keeps_anchoring() {
    let fixture = fixture();
    let mut synchronizer = active_synchronizer(&fixture);
    let person = fixture.layout.visual_node_for_represented("person").unwrap();
    fixture
        .layout
        .update_visual_entity(
            &person.identifier,
            VisualEntityUpdate::position(Position {
                anchored: true,
                ..person.position
            }),
        )
        .unwrap();

    synchronizer
        .handle_gesture(DiagramGesture::NodeDragStop {
            node: "person".to_string(),
            position: Position::new(70.0, 80.0),
        })
        .unwrap();

    let stored = fixture.layout.visual_node_for_represented("person").unwrap().position;
    assert!(stored.same_location(&Position::new(70.0, 80.0)));
    assert!(stored.anchored);
}

#[test]
fn test_write_back_round_trip() {
    let aggregator = Aggregator::new();
    let local = Arc::new(InMemorySemanticModel::new(LOCAL));
    let layout = Arc::new(InMemoryVisualModel::new(LAYOUT));
    aggregator.add_model(local.clone()).unwrap();
    aggregator.add_visual_model(layout.clone()).unwrap();

    let view = aggregator.view();
    let mut synchronizer = DiagramSynchronizer::new(view.clone(), SyncSettings::default());
    view.change_active_visual_model(Some(LAYOUT)).unwrap();
    synchronizer.process_pending();
    assert!(synchronizer.diagram().nodes.is_empty());

    let created = local
        .execute_operation(Operation::CreateClass {
            id: None,
            iri: None,
            name: LanguageString::with("en", "Vehicle"),
            description: LanguageString::new(),
        })
        .unwrap()
        .id
        .unwrap();
    let position = Position::new(12.5, -3.0);
    layout
        .add_visual_node(VisualNodeSpec::new(LOCAL, created.clone(), position))
        .unwrap();
    synchronizer.process_pending();
    synchronizer.full_reset();

    let diagram = synchronizer.diagram();
    assert_eq!(diagram.nodes.len(), 1);
    assert_eq!(diagram.nodes[0].id, created);
    assert_eq!(diagram.nodes[0].position, position);
    assert_eq!(diagram.nodes[0].data.label, "Vehicle");
}

#[test]
fn test_model_color_propagates() {
    let fixture = fixture();
    let mut synchronizer = active_synchronizer(&fixture);

    fixture
        .layout
        .set_model_color(LOCAL, Some(Color::rgb(0x11, 0x22, 0x33)))
        .unwrap();
    synchronizer.process_pending();

    let diagram = synchronizer.diagram();
    assert!(diagram.nodes.iter().all(|node| node.data.color == "#112233"));
    assert!(diagram.edges.iter().all(|edge| edge.data.color == "#112233"));

    fixture.layout.set_model_color(LOCAL, None).unwrap();
    synchronizer.process_pending();
    assert_eq!(synchronizer.diagram().node("person").unwrap().data.color, "#ffffff");
}

#[test]
fn test_removed_class_cascades_to_touching_edges() {
    let fixture = fixture();
    let mut synchronizer = active_synchronizer(&fixture);

    fixture.local.execute_operation(Operation::delete("address")).unwrap();
    synchronizer.process_pending();

    let diagram = synchronizer.diagram();
    assert!(diagram.node("address").is_none());
    assert!(diagram.edge("lives-at").is_none());
    assert!(fixture.layout.visual_node_for_represented("address").is_none());
    assert!(fixture.layout.visual_relationship_for_represented("lives-at").is_none());
    // The relationship itself is left to its model
    assert!(fixture.local.entity("lives-at").is_some());
    // Unrelated items survive
    assert!(diagram.edge("employee-is-person").is_some());
}

#[test]
fn test_renamed_class_updates_node_and_profiles() {
    let fixture = fixture();
    let mut synchronizer = active_synchronizer(&fixture);

    fixture
        .local
        .execute_operation(Operation::CreateClassUsage {
            id: Some("worker".to_string()),
            usage_of: "employee".to_string(),
            iri: None,
            name: None,
            description: None,
            usage_note: None,
        })
        .unwrap();
    synchronizer
        .add_to_view("worker", Position::new(0.0, 400.0))
        .unwrap();
    synchronizer.show_profile_link("worker").unwrap();

    let diagram = synchronizer.diagram();
    let worker = diagram.node("worker").unwrap();
    assert_eq!(worker.data.label, "Employee");
    assert_eq!(worker.data.profile_of.as_deref(), Some("Employee"));
    let link = diagram.edge("worker").unwrap();
    assert_eq!(link.data.kind, EdgeKind::ClassProfile);
    assert_eq!((link.source.as_str(), link.target.as_str()), ("worker", "employee"));

    fixture
        .local
        .execute_operation(Operation::ModifyClass {
            id: "employee".to_string(),
            iri: None,
            name: Some(LanguageString::with("en", "Staff")),
            description: None,
        })
        .unwrap();
    synchronizer.process_pending();

    let diagram = synchronizer.diagram();
    assert_eq!(diagram.node("employee").unwrap().data.label, "Staff");
    assert_eq!(diagram.node("worker").unwrap().data.label, "Staff");
}

#[test]
fn test_connect_creates_relationship_through_dialog() {
    let fixture = fixture();
    let contexts: Arc<Mutex<Vec<ConnectionContext>>> = Arc::default();
    let seen = contexts.clone();
    let dialog = move |context: &ConnectionContext| {
        seen.lock().push(context.clone());
        Some(ConnectionRequest {
            model_id: LOCAL.to_string(),
            operation: Operation::create_relationship(
                context.source.clone(),
                context.target.clone(),
                "http://example.com/works-at",
                LanguageString::with("en", "works at"),
            ),
        })
    };
    let mut synchronizer = active_synchronizer(&fixture).with_connection_dialog(Arc::new(dialog));

    synchronizer
        .handle_gesture(DiagramGesture::Connect {
            source: "employee".to_string(),
            target: "address".to_string(),
        })
        .unwrap();

    let contexts = contexts.lock();
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].writable_models, vec![LOCAL.to_string()]);
    assert!(contexts[0].source_entity.is_some());

    let diagram = synchronizer.diagram();
    let created = diagram
        .edges
        .iter()
        .find(|edge| edge.data.label == "works at")
        .unwrap();
    assert_eq!((created.source.as_str(), created.target.as_str()), ("employee", "address"));
    assert!(fixture.local.entity(&created.id).is_some());
}

#[test]
fn test_cancelled_connection_changes_nothing() {
    let fixture = fixture();
    let dialog = |_: &ConnectionContext| -> Option<ConnectionRequest> { None };
    let mut synchronizer = active_synchronizer(&fixture).with_connection_dialog(Arc::new(dialog));
    let before = synchronizer.diagram();

    synchronizer
        .handle_gesture(DiagramGesture::Connect {
            source: "person".to_string(),
            target: "address".to_string(),
        })
        .unwrap();
    assert_eq!(synchronizer.diagram(), before);
    assert_eq!(fixture.local.len(), 6);
}

#[test]
fn test_read_only_model_rejects_gestures() {
    let fixture = fixture();
    let frozen = Arc::new(
        ReadOnlyVisualModel::from_parts(
            "frozen",
            fixture.layout.visual_entities().into_values(),
            IndexMap::new(),
        )
        .unwrap(),
    );
    fixture.aggregator.add_visual_model(frozen).unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    let view = fixture.aggregator.view();
    let mut synchronizer =
        DiagramSynchronizer::new(view.clone(), SyncSettings::default()).with_notifier(notifier.clone());
    view.change_active_visual_model(Some("frozen")).unwrap();
    synchronizer.process_pending();
    let before = synchronizer.diagram();
    assert_eq!(before.nodes.len(), 3);

    let result = synchronizer.handle_gesture(DiagramGesture::NodeDragStop {
        node: "person".to_string(),
        position: Position::new(99.0, 99.0),
    });
    assert!(matches!(result, Err(ModelError::NotWritable(ref id)) if id == "frozen"));
    assert_eq!(notifier.errors.lock().len(), 1);
    assert_eq!(synchronizer.diagram(), before);
}

#[test]
fn test_actions_without_active_model_are_reported() {
    let fixture = fixture();
    let notifier = Arc::new(RecordingNotifier::default());
    let mut synchronizer = DiagramSynchronizer::new(fixture.aggregator.view(), SyncSettings::default())
        .with_notifier(notifier.clone());
    synchronizer.process_pending();

    let result = synchronizer.add_to_view("person", Position::new(0.0, 0.0));
    assert!(matches!(result, Err(ModelError::NoActiveVisualModel)));
    let result = synchronizer.handle_gesture(DiagramGesture::NodeDragStop {
        node: "person".to_string(),
        position: Position::new(1.0, 1.0),
    });
    assert!(matches!(result, Err(ModelError::NoActiveVisualModel)));
    assert_eq!(notifier.errors.lock().len(), 2);
    assert!(synchronizer.diagram().nodes.is_empty());
}

#[test]
fn test_attributes_cannot_be_added_as_edges() {
    let fixture = fixture();
    let mut synchronizer = active_synchronizer(&fixture);
    let result = synchronizer.add_to_view("age", Position::new(0.0, 0.0));
    assert!(matches!(result, Err(ModelError::OperationRejected(_))));
    assert!(fixture.layout.visual_relationship_for_represented("age").is_none());
}

#[test]
fn test_remove_from_view() {
    let fixture = fixture();
    let mut synchronizer = active_synchronizer(&fixture);

    synchronizer.remove_from_view("employee-is-person").unwrap();
    assert!(synchronizer.diagram().edge("employee-is-person").is_none());
    // The semantic entity stays
    assert!(fixture.local.entity("employee-is-person").is_some());

    let result = synchronizer.remove_from_view("employee-is-person");
    assert!(matches!(result, Err(ModelError::UnknownVisualEntity(_))));
}

#[test]
fn test_switching_active_model() {
    let fixture = fixture();
    let compact = Arc::new(InMemoryVisualModel::new("compact"));
    compact
        .add_visual_node(VisualNodeSpec::new(LOCAL, "person", Position::new(10.0, 10.0)))
        .unwrap();
    fixture.aggregator.add_visual_model(compact.clone()).unwrap();

    let mut synchronizer = active_synchronizer(&fixture);
    assert_eq!(synchronizer.diagram().nodes.len(), 3);

    synchronizer
        .view()
        .change_active_visual_model(Some("compact"))
        .unwrap();
    synchronizer.process_pending();
    assert_eq!(synchronizer.state(), SyncState::Loaded);
    let diagram = synchronizer.diagram();
    assert_eq!(diagram.nodes.len(), 1);
    assert!(diagram.edges.is_empty());
    assert_eq!(diagram.node("person").unwrap().position, Position::new(10.0, 10.0));

    // Changes of the inactive model do not reach the diagram
    let address = fixture.layout.visual_node_for_represented("address").unwrap();
    fixture.layout.delete_visual_entity(&address.identifier).unwrap();
    synchronizer.process_pending();
    assert_eq!(synchronizer.diagram().nodes.len(), 1);

    // Deleting the active model leaves the diagram empty
    fixture.aggregator.delete_visual_model("compact").unwrap();
    synchronizer.process_pending();
    assert_eq!(synchronizer.state(), SyncState::Uninitialized);
    assert!(synchronizer.diagram().nodes.is_empty());
}

#[test]
fn test_surface_receives_each_batch() {
    let fixture = fixture();
    let rendered: Arc<Mutex<Vec<Diagram>>> = Arc::default();
    let sink = rendered.clone();
    let view = fixture.aggregator.view();
    let mut synchronizer = DiagramSynchronizer::new(view.clone(), SyncSettings::default())
        .with_surface(Arc::new(move |diagram: &Diagram| sink.lock().push(diagram.clone())));

    assert_eq!(synchronizer.process_pending(), 0);
    assert!(rendered.lock().is_empty());

    view.change_active_visual_model(Some(LAYOUT)).unwrap();
    synchronizer.process_pending();
    let rendered = rendered.lock();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].nodes.len(), 3);
}

#[test]
fn test_selection_is_recorded() {
    let fixture = fixture();
    let mut synchronizer = active_synchronizer(&fixture);
    synchronizer
        .handle_gesture(DiagramGesture::SelectionChange {
            nodes: vec!["person".to_string()],
            edges: vec!["lives-at".to_string()],
        })
        .unwrap();
    assert_eq!(synchronizer.selection(), ["person", "lives-at"]);
}
