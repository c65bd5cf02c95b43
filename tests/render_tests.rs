//! Renderer tests
//!
//! Builds trees over an in-memory store and checks the resulting shape and
//! statuses.

use kxray::xray::{RenderContext, RenderInput, Renderer, Status, Tree, XrayError};
use kxray::{MemoryAccessor, ResourceKind as K, XrayModel};
use kube::core::DynamicObject;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

fn pod(name: &str, labels: Value, spec: Value) -> Value {
    json!({
        "apiVersion": "v1", "kind": "Pod",
        "metadata": {"name": name, "namespace": "default", "labels": labels},
        "spec": spec,
        "status": {
            "phase": "Running",
            "containerStatuses": [{
                "name": "nginx", "ready": true, "restartCount": 0,
                "image": "nginx:1.25", "imageID": "", "state": {"running": {}}
            }]
        }
    })
}

fn deployment(name: &str, replicas: i32, available: i32) -> Value {
    json!({
        "apiVersion": "apps/v1", "kind": "Deployment",
        "metadata": {"name": name, "namespace": "default"},
        "spec": {
            "replicas": replicas,
            "selector": {"matchLabels": {"app": name}},
            "template": {"spec": {"containers": [{"name": "nginx"}]}}
        },
        "status": {"availableReplicas": available}
    })
}

fn object(value: Value) -> DynamicObject {
    serde_json::from_value(value).unwrap()
}

fn store(values: Vec<Value>) -> MemoryAccessor {
    let mut store = MemoryAccessor::new();
    for v in values {
        store.insert_value(v).unwrap();
    }
    store
}

async fn build(store: &MemoryAccessor, kind: K, ns: &str) -> Tree {
    XrayModel::new(kind, ns)
        .build(store, CancellationToken::new())
        .await
        .unwrap()
}

fn status_of(tree: &Tree, kind: &K, id: &str) -> Option<Status> {
    let node = tree.find(tree.root(), kind, id)?;
    tree[node].status()
}

#[tokio::test]
async fn test_deployment_replicas() {
    let store = store(vec![
        deployment("nginx", 3, 3),
        deployment("redis", 3, 2),
        pod(
            "nginx-1",
            json!({"app": "nginx"}),
            json!({"containers": [{"name": "nginx", "image": "nginx:1.25"}]}),
        ),
    ]);
    let tree = build(&store, K::DEPLOYMENT, "default").await;

    assert_eq!(status_of(&tree, &K::DEPLOYMENT, "default/nginx"), Some(Status::Ok));
    assert_eq!(status_of(&tree, &K::DEPLOYMENT, "default/redis"), Some(Status::Toast));

    let ns = tree.children(tree.root());
    assert_eq!(ns.len(), 1);
    assert_eq!(tree[ns[0]].id, "-/default");

    let dp = tree.find(tree.root(), &K::DEPLOYMENT, "default/nginx").unwrap();
    let po = tree.find(dp, &K::POD, "default/nginx-1").unwrap();
    assert_eq!(tree[po].info(), Some("1/1"));
    assert_eq!(tree.parent(po), Some(dp));

    let co = tree.find(po, &K::CONTAINER, "nginx").unwrap();
    assert_eq!(tree[co].info(), Some("nginx:1.25"));
}

#[tokio::test]
async fn test_missing_config_map_ref() {
    let spec = |optional: bool| {
        json!({"containers": [{
            "name": "nginx",
            "envFrom": [{"configMapRef": {"name": "cm1", "optional": optional}}]
        }]})
    };

    let required = store(vec![pod("p1", json!({}), spec(false))]);
    let tree = build(&required, K::POD, "default").await;
    assert_eq!(
        status_of(&tree, &K::CONFIG_MAP, "default/cm1"),
        Some(Status::MissingRef)
    );

    let optional = store(vec![pod("p1", json!({}), spec(true))]);
    let tree = build(&optional, K::POD, "default").await;
    assert_eq!(status_of(&tree, &K::CONFIG_MAP, "default/cm1"), Some(Status::Ok));
}

#[tokio::test]
async fn test_env_from_refs() {
    let store = store(vec![
        pod(
            "p1",
            json!({}),
            json!({"containers": [{
                "name": "nginx",
                "envFrom": [
                    {"configMapRef": {"name": "cm1"}},
                    {"secretRef": {"name": "sec1"}}
                ]
            }]}),
        ),
        json!({
            "apiVersion": "v1", "kind": "ConfigMap",
            "metadata": {"name": "cm1", "namespace": "default"}
        }),
    ]);
    let tree = build(&store, K::POD, "default").await;

    let co = tree.find(tree.root(), &K::CONTAINER, "nginx").unwrap();
    assert_eq!(tree.count_children(co), 2);
    assert_eq!(status_of(&tree, &K::CONFIG_MAP, "default/cm1"), Some(Status::Ok));
    assert_eq!(
        status_of(&tree, &K::SECRET, "default/sec1"),
        Some(Status::MissingRef)
    );
}

#[tokio::test]
async fn test_refs_are_deduped() {
    let store = store(vec![pod(
        "p1",
        json!({}),
        json!({
            "containers": [{
                "name": "nginx",
                "envFrom": [{"configMapRef": {"name": "cm1"}}],
                "env": [{
                    "name": "MODE",
                    "valueFrom": {"configMapKeyRef": {"name": "cm1", "key": "mode"}}
                }]
            }],
            "volumes": [{"name": "conf", "configMap": {"name": "cm1"}}]
        }),
    )]);
    let tree = build(&store, K::POD, "default").await;
    assert_eq!(tree.count(&K::CONFIG_MAP), 1);
}

#[tokio::test]
async fn test_pvc_expands_to_volume() {
    let store = store(vec![
        pod(
            "db-0",
            json!({}),
            json!({
                "containers": [{"name": "nginx"}],
                "volumes": [{"name": "data", "persistentVolumeClaim": {"claimName": "data"}}]
            }),
        ),
        json!({
            "apiVersion": "v1", "kind": "PersistentVolumeClaim",
            "metadata": {"name": "data", "namespace": "default"},
            "spec": {"volumeName": "pv-1"},
            "status": {"phase": "Bound"}
        }),
        json!({
            "apiVersion": "v1", "kind": "PersistentVolume",
            "metadata": {"name": "pv-1"}
        }),
    ]);
    let tree = build(&store, K::POD, "default").await;

    let pvc = tree.find(tree.root(), &K::PVC, "default/data").unwrap();
    let pv = tree.find(pvc, &K::PV, "-/pv-1").unwrap();
    assert_eq!(tree.parent(pv), Some(pvc));
    assert_eq!(tree[pv].status(), Some(Status::Ok));
}

#[tokio::test]
async fn test_unbound_claim_still_expands_to_volume() {
    let store = store(vec![
        pod(
            "web-0",
            json!({}),
            json!({
                "containers": [{"name": "nginx"}],
                "volumes": [{"name": "data", "persistentVolumeClaim": {"claimName": "web"}}]
            }),
        ),
        json!({
            "apiVersion": "v1", "kind": "PersistentVolumeClaim",
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {"volumeName": "pv-web"}
        }),
        json!({
            "apiVersion": "v1", "kind": "PersistentVolume",
            "metadata": {"name": "pv-web"}
        }),
    ]);
    let tree = build(&store, K::POD, "default").await;

    let pvc = tree.find(tree.root(), &K::PVC, "default/web").unwrap();
    assert!(tree.find(pvc, &K::PV, "-/pv-web").is_some());
}

#[tokio::test]
async fn test_service_account_automount() {
    let store = store(vec![
        pod(
            "p1",
            json!({}),
            json!({
                "containers": [{"name": "nginx"}],
                "serviceAccountName": "builder",
                "automountServiceAccountToken": false
            }),
        ),
        pod(
            "p2",
            json!({}),
            json!({"containers": [{"name": "nginx"}], "serviceAccountName": "ghost"}),
        ),
        json!({
            "apiVersion": "v1", "kind": "ServiceAccount",
            "metadata": {"name": "builder", "namespace": "default"},
            "secrets": [{"name": "builder-token"}]
        }),
    ]);
    let tree = build(&store, K::POD, "default").await;

    let p1 = tree.find(tree.root(), &K::POD, "default/p1").unwrap();
    let sa = tree.find(p1, &K::SERVICE_ACCOUNT, "default/builder").unwrap();
    assert_eq!(tree[sa].info(), Some("automount:false"));
    let token = tree.find(sa, &K::SECRET, "default/builder-token").unwrap();
    assert_eq!(tree[token].status(), Some(Status::MissingRef));

    assert_eq!(
        status_of(&tree, &K::SERVICE_ACCOUNT, "default/ghost"),
        Some(Status::MissingRef)
    );
}

#[tokio::test]
async fn test_node_groups_pods_by_namespace() {
    let mut scheduled = pod(
        "p1",
        json!({}),
        json!({"containers": [{"name": "nginx"}], "nodeName": "n1"}),
    );
    scheduled["metadata"]["namespace"] = json!("kube-system");
    let store = store(vec![
        scheduled,
        pod(
            "p2",
            json!({}),
            json!({"containers": [{"name": "nginx"}], "nodeName": "n2"}),
        ),
        json!({
            "apiVersion": "v1", "kind": "Node",
            "metadata": {"name": "n1"},
            "status": {"conditions": [{"type": "Ready", "status": "True"}]}
        }),
    ]);
    let tree = build(&store, K::NODE, "").await;

    let node = tree.find(tree.root(), &K::NODE, "n1").unwrap();
    assert_eq!(tree[node].status(), Some(Status::Ok));
    let ns = tree.find_child(node, &K::NAMESPACE, "-/kube-system").unwrap();
    assert!(tree.find_child(ns, &K::POD, "kube-system/p1").is_some());
    assert!(tree.find(tree.root(), &K::POD, "default/p2").is_none());
}

#[tokio::test]
async fn test_service_without_selector() {
    let store = store(vec![
        json!({
            "apiVersion": "v1", "kind": "Service",
            "metadata": {"name": "external", "namespace": "default"},
            "spec": {"ports": [{"port": 80}]}
        }),
        pod("p1", json!({"app": "nginx"}), json!({"containers": [{"name": "nginx"}]})),
    ]);
    let tree = build(&store, K::SERVICE, "default").await;

    let svc = tree.find(tree.root(), &K::SERVICE, "default/external").unwrap();
    assert!(tree.is_leaf(svc));
}

#[tokio::test]
async fn test_unexpected_input() {
    let store = MemoryAccessor::new();
    let mut tree = Tree::new(K::POD, "pods");
    let mut cx = RenderContext::new(&store, &mut tree, CancellationToken::new());

    let svc = object(json!({
        "apiVersion": "v1", "kind": "Service",
        "metadata": {"name": "svc", "namespace": "default"}
    }));
    let err = Renderer::Pod
        .render(&mut cx, "default", RenderInput::Object(svc.clone()))
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("expected Pod"));

    let err = Renderer::Container
        .render(&mut cx, "default", RenderInput::Object(svc))
        .await
        .unwrap_err();
    assert!(matches!(err, XrayError::UnexpectedInput { expected: "Container", .. }));
}

#[tokio::test]
async fn test_missing_parent() {
    let store = MemoryAccessor::new();
    let mut tree = Tree::new(K::POD, "pods");
    let mut cx = RenderContext::new(&store, &mut tree, CancellationToken::new());
    cx.set_parent(None);

    let po = object(pod("p1", json!({}), json!({"containers": [{"name": "nginx"}]})));
    let err = Renderer::Pod
        .render(&mut cx, "default", RenderInput::Object(po))
        .await
        .unwrap_err();
    assert!(matches!(err, XrayError::MissingParent));
}

#[tokio::test]
async fn test_cancelled_budget() {
    let store = store(vec![deployment("nginx", 1, 1)]);
    let budget = CancellationToken::new();
    budget.cancel();

    let err = XrayModel::new(K::DEPLOYMENT, "default")
        .build(&store, budget)
        .await
        .unwrap_err();
    assert!(matches!(err, XrayError::Cancelled));
}

#[tokio::test]
async fn test_app_project_tree() {
    let app = |name: &str, project: &str| {
        json!({
            "apiVersion": "argoproj.io/v1alpha1", "kind": "Application",
            "metadata": {"name": name, "namespace": "argocd"},
            "spec": {"project": project},
            "status": {
                "sync": {"status": "Synced"},
                "health": {"status": "Healthy"},
                "resources": [
                    {"version": "v1", "kind": "Service", "namespace": "guestbook", "name": "ui",
                     "status": "Synced", "health": {"status": "Healthy"}},
                    {"group": "apps", "version": "v1", "kind": "Deployment",
                     "namespace": "guestbook", "name": "ui", "status": "OutOfSync",
                     "health": {"status": "Progressing"}}
                ]
            }
        })
    };
    let store = store(vec![
        json!({
            "apiVersion": "argoproj.io/v1alpha1", "kind": "AppProject",
            "metadata": {"name": "team-a", "namespace": "argocd"}
        }),
        app("guestbook", "team-a"),
        app("billing", "team-b"),
    ]);
    let tree = build(&store, K::APP_PROJECT, "argocd").await;

    let proj = tree.find(tree.root(), &K::APP_PROJECT, "argocd/team-a").unwrap();
    let app = tree.find_child(proj, &K::APPLICATION, "argocd/guestbook").unwrap();
    assert_eq!(tree[app].info(), Some("Synced/Healthy"));
    assert!(tree.find(tree.root(), &K::APPLICATION, "argocd/billing").is_none());

    let section = tree.find_child(app, &K::SECTION, "Deployment").unwrap();
    let res = tree
        .find_child(section, &K::APPLICATION_RESOURCE, "guestbook/ui")
        .unwrap();
    assert_eq!(tree[res].info(), Some("OutOfSync/Progressing"));
    assert_eq!(tree.count_children(app), 2);
}
