mod common;

use std::sync::Arc;
use std::thread;

use insta::assert_snapshot;
use splice::sample;
use splice_tree::Value;

#[test]
fn people_project_into_view_models() {
    let (provider, people) = common::seeded_people();
    let registry = sample::registry().unwrap();

    let models = people
        .extendable(registry.clone())
        .apply(sample::person_view_models(), [])
        .unwrap();
    let results = models.fetch().unwrap();

    assert_eq!(results.len(), 1);
    assert_snapshot!(
        results[0],
        @r#"PersonModel { Friends: [ProfileModel { Name: "Bob" }], Me: ProfileModel { Name: "Alice", SomethingElses: [SomethingElseModel { Name: "Chess" }] } }"#
    );
    let me = results[0].field("Me").unwrap();
    assert_eq!(me.field("Name").and_then(Value::as_str), Some("Alice"));
    let friends = results[0].field("Friends").and_then(Value::as_list).unwrap();
    assert_eq!(friends[0].field("Name").and_then(Value::as_str), Some("Bob"));

    // The provider only ever saw built-in operators.
    let executed = provider.executed();
    assert_eq!(executed.len(), 1);
    assert!(!registry.contains_tagged_call(&executed[0]));
    assert!(
        common::called_functions(&executed[0])
            .iter()
            .all(|name| name.starts_with("query::"))
    );
    assert_snapshot!(
        executed[0],
        @"query::select(@people, |x| PersonModel { Me: ProfileModel { Name: x.Me.Name, SomethingElses: query::select(query::as_queryable(x.Me.SomethingElses), |x| SomethingElseModel { Name: x.Name }) }, Friends: query::select(query::as_queryable(x.Friends), |x| ProfileModel { Name: x.Name }) })"
    );
}

#[test]
fn rewrite_statistics() {
    let (_, people) = common::seeded_people();
    let models = people
        .extendable(sample::registry().unwrap())
        .apply(sample::person_view_models(), [])
        .unwrap();
    let rewriting = models.provider().as_rewriting().unwrap();
    let outcome = rewriting.rewrite(models.expr()).unwrap();

    // Person and Profile overloads, plus SomethingElse inside the template.
    assert_eq!(outcome.expansions, 3);
    assert_eq!(outcome.redirects, 1);
    // `entity` is referenced twice in the template body.
    assert_eq!(outcome.substitutions, 2);
}

#[test]
fn every_fetch_rewrites_and_executes_again() {
    let (provider, people) = common::seeded_people();
    let models = people
        .extendable(sample::registry().unwrap())
        .apply(sample::person_view_models(), [])
        .unwrap();

    assert!(provider.executed().is_empty());
    let first = models.fetch().unwrap();
    let second = models.fetch().unwrap();
    assert_eq!(first, second);
    assert_eq!(provider.executed().len(), 2);
    assert_eq!(models.count().unwrap(), 1);
    assert_eq!(provider.executed().len(), 3);
}

#[test]
fn concurrent_fetches_share_one_handle() {
    let (provider, people) = common::seeded_people();
    let models = Arc::new(
        people
            .extendable(sample::registry().unwrap())
            .apply(sample::person_view_models(), [])
            .unwrap(),
    );
    let expected = models.fetch().unwrap();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let models = models.clone();
                scope.spawn(move || models.fetch().unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
    assert_eq!(provider.executed().len(), 5);
}
