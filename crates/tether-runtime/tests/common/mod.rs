//! Shared models and recorders for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::sync::LazyLock;

use tether_runtime::tether_core::{Entity, EntityId, Model, Result, Schema, SemanticType};
use tether_runtime::{CollectionDelegate, Context, LiveCollection, ObjectChange, SectionChange};

#[derive(Debug, Default, Clone)]
pub struct Team {
    pub name: String,
}

#[derive(Debug, Default, Clone)]
pub struct Person {
    pub name: String,
    pub age: i64,
    pub team: Option<EntityId>,
}

#[derive(Debug, Default, Clone)]
pub struct Post {
    pub title: String,
    pub author: Option<EntityId>,
}

/// Tree node whose `parent` points back into its own registry.
#[derive(Debug, Default, Clone)]
pub struct Node {
    pub label: String,
    pub rank: i64,
    pub parent: Option<EntityId>,
}

static TEAM: LazyLock<Schema<Team>> = LazyLock::new(|| {
    Schema::<Team>::new("Team")
        .property(
            "name",
            SemanticType::Text,
            |t| t.name.clone().into(),
            |t, v| {
                t.name = v.try_text()?;
                Ok(())
            },
        )
        .with_factory(Team::default)
});

static PERSON: LazyLock<Schema<Person>> = LazyLock::new(|| {
    Schema::<Person>::new("Person")
        .property(
            "name",
            SemanticType::Text,
            |p| p.name.clone().into(),
            |p, v| {
                p.name = v.try_text()?;
                Ok(())
            },
        )
        .property(
            "age",
            SemanticType::Int,
            |p| p.age.into(),
            |p, v| {
                p.age = v.try_int()?;
                Ok(())
            },
        )
        .property(
            "team",
            SemanticType::Reference("Team"),
            |p| p.team.into(),
            |p, v| {
                p.team = if v.is_null() { None } else { Some(v.try_reference()?) };
                Ok(())
            },
        )
        .with_factory(Person::default)
});

static POST: LazyLock<Schema<Post>> = LazyLock::new(|| {
    Schema::<Post>::new("Post")
        .property(
            "title",
            SemanticType::Text,
            |p| p.title.clone().into(),
            |p, v| {
                p.title = v.try_text()?;
                Ok(())
            },
        )
        .property(
            "author",
            SemanticType::Reference("Person"),
            |p| p.author.into(),
            |p, v| {
                p.author = if v.is_null() { None } else { Some(v.try_reference()?) };
                Ok(())
            },
        )
        .with_factory(Post::default)
});

static NODE: LazyLock<Schema<Node>> = LazyLock::new(|| {
    Schema::<Node>::new("Node")
        .property(
            "label",
            SemanticType::Text,
            |n| n.label.clone().into(),
            |n, v| {
                n.label = v.try_text()?;
                Ok(())
            },
        )
        .property(
            "rank",
            SemanticType::Int,
            |n| n.rank.into(),
            |n, v| {
                n.rank = v.try_int()?;
                Ok(())
            },
        )
        .property(
            "parent",
            SemanticType::Reference("Node"),
            |n| n.parent.into(),
            |n, v| {
                n.parent = if v.is_null() { None } else { Some(v.try_reference()?) };
                Ok(())
            },
        )
        .with_factory(Node::default)
});

impl Model for Team {
    fn schema() -> &'static Schema<Self> {
        &TEAM
    }
}

impl Model for Person {
    fn schema() -> &'static Schema<Self> {
        &PERSON
    }
}

impl Model for Post {
    fn schema() -> &'static Schema<Self> {
        &POST
    }
}

impl Model for Node {
    fn schema() -> &'static Schema<Self> {
        &NODE
    }
}

/// Route `RUST_LOG`-filtered logs to the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn context() -> Context {
    init_tracing();
    let ctx = Context::default();
    ctx.register_type::<Team>();
    ctx.register_type::<Person>();
    ctx.register_type::<Post>();
    ctx.register_type::<Node>();
    ctx
}

pub fn person(name: &str, age: i64) -> Entity<Person> {
    Entity::new(Person {
        name: name.into(),
        age,
        team: None,
    })
}

/// Create and register a tree node.
pub fn save_node(ctx: &Context, label: &str, rank: i64, parent: Option<EntityId>) -> Entity<Node> {
    let node = Entity::new(Node {
        label: label.into(),
        rank,
        parent,
    });
    ctx.save(&node).expect("save node");
    node
}

/// Create and register a person.
pub fn save_person(ctx: &Context, name: &str, age: i64) -> Entity<Person> {
    let p = person(name, age);
    ctx.save(&p).expect("save person");
    p
}

pub fn names(collection: &LiveCollection) -> Vec<String> {
    collection
        .objects_of::<Person>()
        .iter()
        .map(|p| p.with(|p| p.name.clone()))
        .collect()
}

/// Records every delegate callback as a short line.
#[derive(Debug, Default)]
pub struct Recorder {
    log: RefCell<Vec<String>>,
}

impl Recorder {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    /// Object events only, without the batch brackets.
    pub fn take_objects(&self) -> Vec<String> {
        self.take()
            .into_iter()
            .filter(|line| !line.starts_with("section") && line != "will" && line != "did")
            .collect()
    }

    fn push(&self, line: String) -> Result<()> {
        self.log.borrow_mut().push(line);
        Ok(())
    }
}

impl CollectionDelegate for Recorder {
    fn will_change_content(&self, _collection: &LiveCollection) -> Result<()> {
        self.push("will".into())
    }

    fn did_change_section(&self, _collection: &LiveCollection, change: &SectionChange) -> Result<()> {
        self.push(format!("section {} {} {}", change.kind, change.index, change.name))
    }

    fn did_change_object(&self, _collection: &LiveCollection, change: &ObjectChange) -> Result<()> {
        self.push(format!("{} {}", change.kind, change.index))
    }

    fn did_change_content(&self, _collection: &LiveCollection) -> Result<()> {
        self.push("did".into())
    }
}
