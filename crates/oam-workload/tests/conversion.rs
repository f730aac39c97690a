//! End-to-end conversion of YAML manifests into derived objects

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use oam_common::crd::{ApplicationConfigurationSpec, ComponentSchematicSpec};
use oam_workload::{CompiledComponent, WorkloadCompiler, WorkloadObject};
use serde_json::Value;

const SCHEMATIC: &str = r#"
workloadType: core.oam.dev/v1alpha1.Server
parameters:
  - name: greeting
    type: string
    default: hello
  - name: nginx-conf
    type: string
    default: "worker_processes 1;"
containers:
  - name: web
    image: nginx:1.25
    env:
      - name: GREETING
        fromParam: greeting
    ports:
      - name: http
        containerPort: 80
    config:
      - path: /etc/nginx/nginx.conf
        fromParam: nginx-conf
    resources:
      cpu:
        required: 500m
      memory:
        required: 256Mi
"#;

const APP: &str = r#"
variables:
  - name: salutation
    value: bonjour
components:
  - componentName: frontend
    instanceName: shop-frontend
    parameterValues:
      - name: greeting
        value: "[fromVariable(salutation)]"
    traits:
      - name: manual-scaler
        properties:
          replicaCount: 3
      - name: ingress
        properties:
          hostname: shop.example.com
          servicePort: 80
"#;

fn owner() -> OwnerReference {
    OwnerReference {
        api_version: "core.oam.dev/v1alpha1".to_string(),
        kind: "ApplicationConfiguration".to_string(),
        name: "shop".to_string(),
        uid: "uid-shop".to_string(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

fn compile(schematic: &str, app: &str) -> CompiledComponent {
    let schematic: ComponentSchematicSpec = serde_yaml::from_str(schematic).unwrap();
    let app: ApplicationConfigurationSpec = serde_yaml::from_str(app).unwrap();
    let owner = owner();
    WorkloadCompiler::new("shop", "retail", &owner, &app.components[0], &schematic)
        .with_variables(&app.variables)
        .compile()
        .unwrap()
}

/// Story: a scaled Server with an ingress produces every sibling object
#[test]
fn story_server_with_ingress() {
    let compiled = compile(SCHEMATIC, APP);
    let objects = compiled.desired_objects().unwrap();

    let kinds: Vec<&str> = objects.iter().map(|o| o.kind()).collect();
    assert_eq!(kinds, vec!["ConfigMap", "Deployment", "Service", "Ingress"]);

    for object in &objects {
        assert_eq!(object.namespace, "retail");
        let owners = &object.body["metadata"]["ownerReferences"];
        assert_eq!(owners[0]["uid"], "uid-shop");
        assert_eq!(object.body["metadata"]["labels"]["instance"], "shop-frontend");
    }

    let deploy = &objects[1].body;
    assert_eq!(deploy["spec"]["replicas"], 3);
    let container = &deploy["spec"]["template"]["spec"]["containers"][0];
    assert_eq!(container["env"][0]["value"], "bonjour");
    assert_eq!(container["resources"]["limits"]["cpu"], "500m");
    assert_eq!(container["resources"]["requests"]["memory"], "256Mi");

    let config = &objects[0].body;
    assert_eq!(config["metadata"]["name"], "shop-frontend-web");
    assert_eq!(config["data"]["nginx.conf"], "worker_processes 1;");

    let ingress = &objects[3].body;
    assert_eq!(ingress["spec"]["rules"][0]["host"], "shop.example.com");
    assert_eq!(
        ingress["spec"]["rules"][0]["http"]["paths"][0]["backend"]["service"]["name"],
        "shop-frontend"
    );
}

/// Story: a Task runs as a Job
#[test]
fn story_task_runs_as_job() {
    let schematic = SCHEMATIC.replace("v1alpha1.Server", "v1alpha1.Task");
    let compiled = compile(&schematic, APP);

    let Some(WorkloadObject::Job(job)) = &compiled.workload else {
        panic!("expected a Job");
    };
    assert_eq!(job.spec.parallelism, 3);
    assert!(compiled.service.is_none());
    assert!(compiled.ingress.is_none());
}

const MYSQL: &str = r#"
workloadType: harmonycloud.cn/v1alpha1.MysqlCluster
parameters:
  - name: password
    default: secret
containers:
  - name: mysql
    image: mysql:5.7
workloadSettings:
  - name: spec
    value:
      version: "5.7"
      secretName: mysql-secret
      cmName: mysql-config
      volumeQuota: "20"
  - name: config
    fromParam: mycnf
    default: "[mysqld]"
"#;

/// Story: a MysqlCluster component yields the cluster, its config and its claim
#[test]
fn story_mysql_cluster() {
    let compiled = compile(MYSQL, APP);
    let objects = compiled.desired_objects().unwrap();

    let kinds: Vec<&str> = objects.iter().map(|o| o.kind()).collect();
    assert_eq!(kinds, vec!["ConfigMap", "PersistentVolumeClaim", "MysqlCluster"]);

    let cluster: &Value = &objects[2].body;
    assert_eq!(cluster["spec"]["replicas"], 3);
    assert_eq!(objects[0].name, "mysql-config");
    assert_eq!(objects[0].body["data"]["my.cnf.tmpl"], "[mysqld]");
    assert_eq!(
        objects[1].body["spec"]["resources"]["requests"]["storage"],
        "20G"
    );
    assert!(compiled.service.is_none());
}

/// Story: a MysqlCluster without its required settings derives nothing
#[test]
fn story_mysql_without_settings_is_skipped() {
    let schematic = MYSQL.replace("volumeQuota", "quota");
    let compiled = compile(&schematic, APP);

    assert!(compiled.workload.is_none());
    assert!(compiled.desired_objects().unwrap().is_empty());
    assert!(!compiled.warnings.is_empty());
}

/// Story: two config files in one directory share one ConfigMap and one volume
#[test]
fn story_config_files_share_one_config_map() {
    let schematic = SCHEMATIC.replace(
        "      - path: /etc/nginx/nginx.conf\n        fromParam: nginx-conf\n",
        "      - path: /etc/app/a.conf\n        value: alpha\n      - path: /etc/app/b.conf\n        value: beta\n",
    );
    let compiled = compile(&schematic, APP);
    let objects = compiled.desired_objects().unwrap();

    let config_maps: Vec<_> = objects.iter().filter(|o| o.kind() == "ConfigMap").collect();
    assert_eq!(config_maps.len(), 1);
    let data = config_maps[0].body["data"].as_object().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data["a.conf"], "alpha");
    assert_eq!(data["b.conf"], "beta");

    let deploy = objects.iter().find(|o| o.kind() == "Deployment").unwrap();
    let pod = &deploy.body["spec"]["template"]["spec"];
    let volumes = pod["volumes"].as_array().unwrap();
    let config_volumes: Vec<&Value> = volumes
        .iter()
        .filter(|v| v["configMap"]["name"] == "shop-frontend-web")
        .collect();
    assert_eq!(config_volumes.len(), 1);
    assert_eq!(config_volumes[0]["name"], "shop-frontend-web-config");
    assert_eq!(config_volumes[0]["configMap"]["items"].as_array().unwrap().len(), 2);

    let mounts: Vec<(&str, &str)> = pod["containers"][0]["volumeMounts"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["name"] == "shop-frontend-web-config")
        .map(|m| (m["mountPath"].as_str().unwrap(), m["subPath"].as_str().unwrap()))
        .collect();
    assert_eq!(mounts, vec![("/etc/app/a.conf", "a.conf"), ("/etc/app/b.conf", "b.conf")]);
}
