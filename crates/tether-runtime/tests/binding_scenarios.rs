mod common;

use std::rc::Rc;

use common::{Person, Recorder, Team, context, names, save_person};
use tether_runtime::tether_core::{Entity, Value};
use tether_runtime::{BindingEngine, BindingScope, Control, LiveCollection, Predicate, SortKey};

#[test]
fn text_control_round_trip() {
    let ctx = context();
    let ada = save_person(&ctx, "Ada", 5);
    let age = Control::new(Value::from("0"));
    let binding = BindingEngine::new(&ctx)
        .bind_control_to_entity_property(&age, &ada.erase(), "age", None)
        .unwrap();
    assert_eq!(age.get(), Value::from("5"));

    let version = age.version();
    age.set(Value::from("10")).unwrap();
    assert_eq!(ada.get("age").unwrap(), Value::Int(10));
    assert_eq!(age.version(), version + 1);

    binding.unbind();
    binding.unbind();
    age.set(Value::from("11")).unwrap();
    assert_eq!(ada.get("age").unwrap(), Value::Int(10));
}

#[test]
fn control_edits_flow_into_live_collections() {
    let ctx = context();
    let ada = save_person(&ctx, "Ada", 30);
    save_person(&ctx, "Bo", 25);
    let people = LiveCollection::builder(&ctx)
        .source::<Person>()
        .predicate(Predicate::ge("age", 18))
        .sort_by(SortKey::ascending("age"))
        .build()
        .unwrap();
    let recorder = Rc::new(Recorder::default());
    people.set_delegate(&recorder);

    let age = Control::new(Value::Int(0));
    let mut scope = BindingScope::new(&ctx);
    scope
        .register_control(&age, &ada.erase(), "age", None)
        .unwrap();
    assert_eq!(age.get(), Value::Int(30));

    age.set(Value::Int(20)).unwrap();
    assert_eq!(names(&people), ["Ada", "Bo"]);
    assert_eq!(recorder.take_objects(), ["delete 1", "insert 0"]);

    age.set(Value::Int(12)).unwrap();
    assert_eq!(names(&people), ["Bo"]);
    assert_eq!(recorder.take_objects(), ["delete 0"]);
}

#[test]
fn detail_screen_binds_through_a_reference() {
    let ctx = context();
    let red = Entity::new(Team { name: "Red".into() });
    ctx.save(&red).unwrap();
    let ada = save_person(&ctx, "Ada", 30);
    ada.set("team", red.id()).unwrap();

    let team_name = Control::new(Value::from(""));
    let mut scope = BindingScope::new(&ctx);
    scope
        .register_control(&team_name, &ada.erase(), "team.name", None)
        .unwrap();
    assert_eq!(team_name.get(), Value::from("Red"));

    team_name.set(Value::from("Crimson")).unwrap();
    assert_eq!(red.get("name").unwrap(), Value::from("Crimson"));

    assert_eq!(scope.release_entity(ada.id()), 1);
    red.set("name", "Scarlet").unwrap();
    assert_eq!(team_name.get(), Value::from("Crimson"));
}
