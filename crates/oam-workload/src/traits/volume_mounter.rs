//! `volume-mounter`: back a declared volume with a PersistentVolumeClaim

use oam_common::crd::ComponentSchematicSpec;
use serde::Deserialize;
use tracing::warn;

use crate::compiled::ObjectContext;
use crate::helpers::pvc_access_mode;
use crate::k8s::{PersistentVolumeClaim, Volume};

/// Claim for one declared volume
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMounter {
    /// Declared volume name; also the claim name
    pub volume_name: String,
    /// Storage class of the claim
    #[serde(default)]
    pub storage_class: Option<String>,
}

impl VolumeMounter {
    /// Build the claim and the pod volume referencing it.
    ///
    /// Returns `None` when the schematic does not declare the volume or the
    /// volume has no disk. Only ephemeral disks are owned by the application;
    /// other claims outlive it and are adopted through the `application`
    /// annotation.
    pub fn compile(
        &self,
        ctx: &ObjectContext<'_>,
        schematic: &ComponentSchematicSpec,
    ) -> Option<(PersistentVolumeClaim, Volume)> {
        let Some(declared) = schematic.find_volume(&self.volume_name) else {
            warn!(volume = %self.volume_name, instance = %ctx.instance, "volume is not declared by the component");
            return None;
        };
        let Some(disk) = declared.disk.as_ref() else {
            warn!(volume = %self.volume_name, instance = %ctx.instance, "volume declares no disk");
            return None;
        };

        let meta = if disk.ephemeral {
            ctx.trait_meta(&self.volume_name)
        } else {
            ctx.unowned_trait_meta(&self.volume_name)
        };
        let pvc = PersistentVolumeClaim::new(
            meta,
            pvc_access_mode(declared.access_mode),
            disk.required.clone(),
            self.storage_class.clone(),
        );
        Some((pvc, Volume::from_pvc(&self.volume_name, &self.volume_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiled::tests::{context, owner};
    use oam_common::crd::{AccessMode, Container, Disk, Resources, VolumeDeclaration};

    fn schematic(ephemeral: bool) -> ComponentSchematicSpec {
        ComponentSchematicSpec {
            workload_type: "Server".to_string(),
            containers: vec![Container {
                name: "web".to_string(),
                resources: Resources {
                    volumes: vec![
                        VolumeDeclaration {
                            name: "data".to_string(),
                            mount_path: "/data".to_string(),
                            access_mode: Some(AccessMode::RW),
                            disk: Some(Disk {
                                required: "10Gi".to_string(),
                                ephemeral,
                            }),
                            ..Default::default()
                        },
                        VolumeDeclaration {
                            name: "scratch".to_string(),
                            mount_path: "/tmp".to_string(),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn mounter(volume: &str) -> VolumeMounter {
        VolumeMounter {
            volume_name: volume.to_string(),
            storage_class: Some("fast".to_string()),
        }
    }

    /// Story: ephemeral disks are cascade-deleted with the application
    #[test]
    fn story_ephemeral_claim_is_owned() {
        let owner = owner();
        let ctx = context(&owner);
        let (pvc, volume) = mounter("data").compile(&ctx, &schematic(true)).unwrap();

        assert_eq!(pvc.metadata.name, "data");
        assert_eq!(pvc.metadata.owner_references, vec![owner.clone()]);
        assert_eq!(pvc.spec.access_modes, vec!["ReadWriteMany"]);
        assert_eq!(pvc.spec.resources.requests["storage"], "10Gi");
        assert_eq!(pvc.spec.storage_class_name.as_deref(), Some("fast"));
        assert_eq!(pvc.metadata.labels["role"], "trait");
        assert_eq!(
            volume.persistent_volume_claim.unwrap().claim_name,
            "data"
        );
    }

    /// Story: persistent disks keep their data when the application goes away
    #[test]
    fn story_persistent_claim_is_annotated_not_owned() {
        let owner = owner();
        let ctx = context(&owner);
        let (pvc, _) = mounter("data").compile(&ctx, &schematic(false)).unwrap();

        assert!(pvc.metadata.owner_references.is_empty());
        assert_eq!(pvc.metadata.annotations["application"], ctx.application);
    }

    /// Story: undeclared volumes and volumes without a disk are skipped
    #[test]
    fn story_unclaimable_volumes_are_skipped() {
        let owner = owner();
        let ctx = context(&owner);
        assert!(mounter("missing").compile(&ctx, &schematic(true)).is_none());
        assert!(mounter("scratch").compile(&ctx, &schematic(true)).is_none());
    }
}
