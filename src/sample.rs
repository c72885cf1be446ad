//! Sample domain: people, their profiles and view-model projections.
//!
//! Projections are written once as tagged functions and reused inside other
//! projections. `to_view_models` is overloaded on the element type and
//! expands; `to_view_model` maps a single profile and redirects to the
//! `to_public_view_model_expression` template.

use std::sync::{Arc, LazyLock};

use splice_query::{ExpandArgs, Provider, Query, QueryResult, RegistryError, TagRegistry};
use splice_tree::{Callee, Expr, FunctionDecl, Record, Type, Value, ops};

pub const SCOPE: &str = "sample";
pub const PEOPLE: &str = "people";
pub const PUBLIC_VIEW_MODEL_TEMPLATE: &str = "to_public_view_model_expression";

pub fn person() -> Type {
    Type::record("Person")
}

pub fn profile() -> Type {
    Type::record("Profile")
}

pub fn something_else() -> Type {
    Type::record("SomethingElse")
}

fn view_models_of(entity: Type, model: &str) -> Callee {
    FunctionDecl::builder(SCOPE, "to_view_models")
        .param("entities", Type::query(entity))
        .returns(Type::query(Type::record(model)))
        .build()
}

static PERSON_VIEW_MODELS: LazyLock<Callee> =
    LazyLock::new(|| view_models_of(person(), "PersonModel"));
static PROFILE_VIEW_MODELS: LazyLock<Callee> =
    LazyLock::new(|| view_models_of(profile(), "ProfileModel"));
static SOMETHING_ELSE_VIEW_MODELS: LazyLock<Callee> =
    LazyLock::new(|| view_models_of(something_else(), "SomethingElseModel"));
static TO_VIEW_MODEL: LazyLock<Callee> = LazyLock::new(|| {
    FunctionDecl::builder(SCOPE, "to_view_model")
        .param("entity", profile())
        .returns(Type::record("ProfileModel"))
        .build()
});

/// `to_view_models(Query<Person>) -> Query<PersonModel>`
pub fn person_view_models() -> &'static Callee {
    &PERSON_VIEW_MODELS
}

/// `to_view_models(Query<Profile>) -> Query<ProfileModel>`
pub fn profile_view_models() -> &'static Callee {
    &PROFILE_VIEW_MODELS
}

/// `to_view_models(Query<SomethingElse>) -> Query<SomethingElseModel>`
pub fn something_else_view_models() -> &'static Callee {
    &SOMETHING_ELSE_VIEW_MODELS
}

/// `to_view_model(Profile) -> ProfileModel`
pub fn to_view_model() -> &'static Callee {
    &TO_VIEW_MODEL
}

fn person_models(args: &ExpandArgs) -> QueryResult<Query> {
    let entities = args.query(0)?;
    Ok(entities.select(Expr::lambda1("x", person(), |x| {
        let friends = Expr::member(x.clone(), "Friends", Type::seq(profile()));
        Expr::new_record(
            "PersonModel",
            [
                (
                    "Me",
                    Expr::call(
                        to_view_model().clone(),
                        [Expr::member(x, "Me", profile())],
                    ),
                ),
                (
                    "Friends",
                    Expr::call(profile_view_models().clone(), [ops::as_queryable(friends)]),
                ),
            ],
        )
    }))?)
}

fn name_only(args: &ExpandArgs, entity: Type, model: &'static str) -> QueryResult<Query> {
    let entities = args.query(0)?;
    Ok(entities.select(Expr::lambda1("x", entity, |x| {
        Expr::new_record(model, [("Name", Expr::member(x, "Name", Type::Str))])
    }))?)
}

/// Template for `to_view_model`. Its body reuses another projection on a
/// collection of the parameter.
pub fn public_view_model_template() -> Expr {
    Expr::lambda1("entity", profile(), |entity| {
        let extras = Expr::member(
            entity.clone(),
            "SomethingElses",
            Type::seq(something_else()),
        );
        Expr::new_record(
            "ProfileModel",
            [
                ("Name", Expr::member(entity, "Name", Type::Str)),
                (
                    "SomethingElses",
                    Expr::call(
                        something_else_view_models().clone(),
                        [ops::as_queryable(extras)],
                    ),
                ),
            ],
        )
    })
}

pub fn registry() -> Result<Arc<TagRegistry>, RegistryError> {
    TagRegistry::builder()
        .expandable(person_view_models(), person_models)
        .expandable(profile_view_models(), |args: &ExpandArgs| {
            name_only(args, profile(), "ProfileModel")
        })
        .expandable(something_else_view_models(), |args: &ExpandArgs| {
            name_only(args, something_else(), "SomethingElseModel")
        })
        .redirect(to_view_model(), PUBLIC_VIEW_MODEL_TEMPLATE)
        .factory(SCOPE, PUBLIC_VIEW_MODEL_TEMPLATE, public_view_model_template)
        .build()
}

fn something_else_row(id: i64, name: &str) -> Value {
    Record::new("SomethingElse")
        .with("Id", id)
        .with("Name", name)
        .into()
}

fn profile_row(id: i64, name: &str, extras: Vec<Value>) -> Value {
    Record::new("Profile")
        .with("Id", id)
        .with("Name", name)
        .with("SomethingElses", extras)
        .into()
}

/// Alice, whose only friend is Bob.
pub fn seed_people() -> Vec<Value> {
    let alice = profile_row(1, "Alice", vec![something_else_row(1, "Chess")]);
    let bob = profile_row(2, "Bob", Vec::new());
    vec![
        Record::new("Person")
            .with("Id", 1)
            .with("ProfileId", 1)
            .with("Me", alice)
            .with("Friends", vec![bob])
            .into(),
    ]
}

/// The unwrapped `people` table of `provider`.
pub fn people(provider: Arc<dyn Provider>) -> Query {
    Query::source(provider, PEOPLE, person())
}
