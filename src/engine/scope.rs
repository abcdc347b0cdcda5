//! Scope resolution and ownership checks.
//!
//! Runs before any request is sent; every failure here aborts the whole
//! invocation. A test belongs to its route, and through the route to the
//! route's project; the test row's own `project_id` is not consulted.

use super::http::join_url;
use super::runner::ScheduledTest;
use crate::domain::{Project, ProjectId, Route, RouteId, Test, TestId, UserId};
use crate::error::{EngineError, EngineResult};
use crate::store::Catalog;
use std::collections::HashMap;

pub fn require_user(catalog: &dyn Catalog, caller: UserId) -> EngineResult<()> {
    if catalog.user_exists(caller)? {
        Ok(())
    } else {
        Err(EngineError::not_found("user", caller))
    }
}

pub fn owned_project(
    catalog: &dyn Catalog,
    caller: UserId,
    project_id: ProjectId,
) -> EngineResult<Project> {
    require_user(catalog, caller)?;
    let project = catalog
        .project(project_id)?
        .ok_or_else(|| EngineError::not_found("project", project_id))?;
    if project.user_id != caller {
        return Err(EngineError::unauthorized("project", project_id));
    }
    Ok(project)
}

/// Route must exist and belong to `project`.
pub fn route_in_project(
    catalog: &dyn Catalog,
    project: &Project,
    route_id: RouteId,
) -> EngineResult<Route> {
    catalog
        .route(route_id)?
        .filter(|route| route.project_id == project.id)
        .ok_or_else(|| EngineError::not_found("route", route_id))
}

pub fn owned_test(catalog: &dyn Catalog, caller: UserId, test_id: TestId) -> EngineResult<Test> {
    require_user(catalog, caller)?;
    let test = catalog
        .test(test_id)?
        .ok_or_else(|| EngineError::not_found("test", test_id))?;
    if test.user_id != caller {
        return Err(EngineError::unauthorized("test", test_id));
    }
    Ok(test)
}

fn schedule(project: &Project, route: &Route, test: Test) -> ScheduledTest {
    ScheduledTest {
        url: join_url(&project.base_url, &route.name),
        test,
    }
}

#[derive(Debug, Clone)]
pub struct RouteScope {
    pub project: Project,
    pub route: Route,
    pub tests: Vec<ScheduledTest>,
}

pub fn resolve_route(
    catalog: &dyn Catalog,
    caller: UserId,
    project_id: ProjectId,
    route_id: RouteId,
) -> EngineResult<RouteScope> {
    let project = owned_project(catalog, caller, project_id)?;
    let route = route_in_project(catalog, &project, route_id)?;
    let tests = catalog
        .tests_in_route(route.id)?
        .into_iter()
        .map(|test| schedule(&project, &route, test))
        .collect();
    Ok(RouteScope {
        project,
        route,
        tests,
    })
}

#[derive(Debug, Clone)]
pub struct ProjectScope {
    pub project: Project,
    pub tests: Vec<ScheduledTest>,
}

pub fn resolve_project(
    catalog: &dyn Catalog,
    caller: UserId,
    project_id: ProjectId,
) -> EngineResult<ProjectScope> {
    let project = owned_project(catalog, caller, project_id)?;
    let routes: HashMap<RouteId, Route> = catalog
        .routes_in_project(project.id)?
        .into_iter()
        .map(|route| (route.id, route))
        .collect();
    let tests = catalog
        .tests_in_project(project.id)?
        .into_iter()
        .filter_map(|test| {
            let route = routes.get(&test.route_id)?;
            Some(schedule(&project, route, test))
        })
        .collect();
    Ok(ProjectScope { project, tests })
}

#[derive(Debug, Clone)]
pub struct TestScope {
    pub project: Project,
    pub route: Route,
    pub test: ScheduledTest,
}

pub fn resolve_test(catalog: &dyn Catalog, caller: UserId, test_id: TestId) -> EngineResult<TestScope> {
    let test = owned_test(catalog, caller, test_id)?;
    let route = catalog
        .route(test.route_id)?
        .ok_or_else(|| EngineError::not_found("route", test.route_id))?;
    let project = catalog
        .project(route.project_id)?
        .ok_or_else(|| EngineError::not_found("project", route.project_id))?;
    let scheduled = schedule(&project, &route, test);
    Ok(TestScope {
        project,
        route,
        test: scheduled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::SqliteStore;

    struct Fixture {
        store: SqliteStore,
        owner: UserId,
        stranger: UserId,
        project: ProjectId,
        route: RouteId,
        other_route: RouteId,
        test: TestId,
    }

    fn fixture() -> Fixture {
        let store = SqliteStore::open_in_memory().expect("store");
        let owner = store.insert_user("owner", "o@example.com").unwrap();
        let stranger = store.insert_user("stranger", "s@example.com").unwrap();
        let project = store
            .insert_project(owner, "p", "", "http://api.test/")
            .unwrap();
        let route = store.insert_route(project, "/login", "POST").unwrap();
        let other_project = store.insert_project(stranger, "q", "", "http://q.test").unwrap();
        let other_route = store.insert_route(other_project, "/x", "GET").unwrap();
        let test = store.insert_test(owner, project, route, "{}").unwrap();
        Fixture {
            store,
            owner,
            stranger,
            project,
            route,
            other_route,
            test,
        }
    }

    #[test]
    fn resolves_route_with_joined_urls() {
        let f = fixture();
        let scope = resolve_route(&f.store, f.owner, f.project, f.route).expect("scope");
        assert_eq!(scope.tests.len(), 1);
        assert_eq!(scope.tests[0].url, "http://api.test/login");
    }

    #[test]
    fn unknown_user_is_not_found() {
        let f = fixture();
        let err = resolve_route(&f.store, 999, f.project, f.route).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "user", .. }));
    }

    #[test]
    fn foreign_project_is_unauthorized() {
        let f = fixture();
        let err = resolve_route(&f.store, f.stranger, f.project, f.route).unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized { entity: "project", .. }));
    }

    #[test]
    fn route_from_another_project_is_not_found() {
        let f = fixture();
        let err = resolve_route(&f.store, f.owner, f.project, f.other_route).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "route", .. }));
    }

    #[test]
    fn single_test_checks_ownership() {
        let f = fixture();
        let scope = resolve_test(&f.store, f.owner, f.test).expect("scope");
        assert_eq!(scope.route.id, f.route);
        assert_eq!(scope.test.url, "http://api.test/login");

        let err = resolve_test(&f.store, f.stranger, f.test).unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized { entity: "test", .. }));

        let err = resolve_test(&f.store, f.owner, 12345).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "test", .. }));
    }

    #[test]
    fn project_scope_collects_all_routes() {
        let f = fixture();
        let second_route = f.store.insert_route(f.project, "logout", "POST").unwrap();
        f.store
            .insert_test(f.owner, f.project, second_route, "{}")
            .unwrap();

        let scope = resolve_project(&f.store, f.owner, f.project).expect("scope");
        let urls: Vec<&str> = scope.tests.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls, vec!["http://api.test/login", "http://api.test/logout"]);
    }
}
