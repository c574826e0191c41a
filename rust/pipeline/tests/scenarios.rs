// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end builder scenarios on small hand-made scenes.

use approx::assert_relative_eq;
use gamiflow_mesh::tags::LOD0;
use gamiflow_mesh::{builders, EdgeKey, FaceKey, PolyMesh};
use gamiflow_pipeline::{sets, CollectionKey, ObjectKey, ObjectKind, Scene, Settings, TargetSet};
use nalgebra::{Matrix4, Point3, Rotation3, Vector3};

struct Fixture {
    scene: Scene,
    work: CollectionKey,
}

impl Fixture {
    fn new() -> Self {
        let mut scene = Scene::new("Crate");
        let work = scene.add_collection("Work", None);
        scene.working = Some(work);
        Self { scene, work }
    }

    fn mesh(
        &mut self,
        name: &str,
        mesh: PolyMesh,
        parent: Option<ObjectKey>,
        local: Matrix4<f64>,
    ) -> ObjectKey {
        let data = self.scene.add_mesh(name, mesh, Vec::new());
        let key = self.scene.add_object(name, ObjectKind::Mesh(data), self.work);
        let obj = self.scene.object_mut(key).unwrap();
        obj.parent = parent;
        obj.local = local;
        key
    }

    fn empty(&mut self, name: &str, parent: Option<ObjectKey>, local: Matrix4<f64>) -> ObjectKey {
        let key = self.scene.add_object(name, ObjectKind::empty(), self.work);
        let obj = self.scene.object_mut(key).unwrap();
        obj.parent = parent;
        obj.local = local;
        key
    }

    fn output(&self, target: TargetSet) -> Vec<ObjectKey> {
        self.scene
            .output_collection(target)
            .map(|c| self.scene.objects_in(c))
            .unwrap_or_default()
    }
}

fn translation(x: f64, y: f64, z: f64) -> Matrix4<f64> {
    Matrix4::new_translation(&Vector3::new(x, y, z))
}

fn world_positions(scene: &Scene, object: ObjectKey) -> Vec<Point3<f64>> {
    let world = scene.world_matrix(object);
    let mesh = &scene.object_mesh(object).unwrap().mesh;
    mesh.vertex_keys()
        .filter_map(|v| mesh.position(v))
        .map(|p| world.transform_point(&p))
        .collect()
}

fn contains_point(points: &[Point3<f64>], p: Point3<f64>) -> bool {
    points.iter().any(|q| (q - p).norm() < 1e-9)
}

fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    let sum = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as f64)
}

#[test]
fn locator_root_chain_merges_into_one_mesh_named_after_root() {
    let mut f = Fixture::new();
    let root_local =
        translation(1.0, 2.0, 3.0) * Rotation3::from_euler_angles(0.0, 0.0, 0.5).to_homogeneous();
    let root = f.empty("Root", None, root_local);
    let a = f.mesh("ChildA", builders::cube(1.0), Some(root), translation(2.0, 0.0, 0.0));
    let b = f.mesh("ChildB", builders::cube(1.0), Some(a), translation(0.0, 3.0, 0.0));

    let root_world = f.scene.world_matrix(root);
    let corner = Point3::new(0.5, 0.5, 0.5);
    let corner_a = f.scene.world_matrix(a).transform_point(&corner);
    let corner_b = f.scene.world_matrix(b).transform_point(&corner);

    let report = sets::export::build(&mut f.scene, &Settings::default()).unwrap();
    assert_eq!(report.generated, 1);
    assert_eq!(report.merged_chunks, 1);

    let objects = f.output(TargetSet::Export);
    assert_eq!(objects.len(), 1);
    let merged = objects[0];
    assert_eq!(f.scene.object_name(merged), "Root_e");
    assert!(f.scene.object(merged).unwrap().kind.is_mesh());
    assert_relative_eq!(f.scene.world_matrix(merged), root_world, epsilon = 1e-9);

    let data = f.scene.object_mesh(merged).unwrap();
    assert_eq!(data.mesh.face_count(), 24);
    assert_eq!(data.materials, vec!["UDIM_0"]);
    let points = world_positions(&f.scene, merged);
    assert!(contains_point(&points, corner_a));
    assert!(contains_point(&points, corner_b));

    // the working scene is left alone
    assert_eq!(f.scene.objects_in(f.work).len(), 3);
    assert_eq!(f.scene.object_mesh(a).unwrap().mesh.face_count(), 6);
    assert_eq!(f.scene.object(b).unwrap().parent, Some(a));
}

#[test]
fn level_tagged_edge_follows_export_lod() {
    let mut f = Fixture::new();
    let mut mesh = builders::quad_grid(2, 1, 1.0);
    let middle: Vec<EdgeKey> = mesh
        .edge_keys()
        .filter(|e| mesh.edge_face_count(*e) == 2)
        .collect();
    mesh.set_edge_level(&middle, LOD0 + 1);
    f.mesh("Strip", mesh, None, Matrix4::identity());

    sets::export::build(&mut f.scene, &Settings::default()).unwrap();
    let strip = f.scene.find_object("Strip_e").unwrap();
    // two quads, triangulated
    assert_eq!(f.scene.object_mesh(strip).unwrap().mesh.face_count(), 4);

    let lod1 = Settings {
        export_lod: 1,
        ..Settings::default()
    };
    sets::export::build(&mut f.scene, &lod1).unwrap();
    let strip = f.scene.find_object("Strip_e").unwrap();
    assert_eq!(f.scene.object_mesh(strip).unwrap().mesh.face_count(), 2);
}

#[test]
fn instanced_collection_compiles_once_and_stamps_per_instance() {
    let mut f = Fixture::new();
    let bolts = f.scene.add_collection("Bolts", None);
    f.scene.collection_mut(bolts).unwrap().instance_offset = Vector3::new(0.0, 0.0, 1.0);
    let data = f.scene.add_mesh("Bolt", builders::cube(1.0), Vec::new());
    let bolt = f.scene.add_object("Bolt", ObjectKind::Mesh(data), bolts);
    f.scene.object_mut(bolt).unwrap().local = translation(0.0, 0.0, 1.0);

    let left = f.empty("Left", None, translation(5.0, 0.0, 0.0));
    let right = f.empty(
        "Right",
        None,
        translation(-5.0, 0.0, 0.0)
            * Rotation3::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2).to_homogeneous(),
    );
    for instancer in [left, right] {
        f.scene.object_mut(instancer).unwrap().kind = ObjectKind::Empty {
            instance_collection: Some(bolts),
        };
    }

    let report = sets::export::build(&mut f.scene, &Settings::default()).unwrap();
    assert_eq!(report.template_builds, 1);
    assert_eq!(report.stamped, 2);

    let objects = f.output(TargetSet::Export);
    assert_eq!(objects.len(), 2);
    for (name, instancer, at) in [
        ("Left_e", left, Point3::new(5.0, 0.0, 0.0)),
        ("Right_e", right, Point3::new(-5.0, 0.0, 0.0)),
    ] {
        let obj = f.scene.find_object(name).unwrap();
        assert!(objects.contains(&obj));
        assert_relative_eq!(
            f.scene.world_matrix(obj),
            f.scene.world_matrix(instancer),
            epsilon = 1e-9
        );
        let data = f.scene.object_mesh(obj).unwrap();
        assert_eq!(data.mesh.face_count(), 12);
        assert_eq!(data.users(), 1);
        assert_relative_eq!(centroid(&world_positions(&f.scene, obj)), at, epsilon = 1e-9);
    }

    assert!(f.scene.find_collection("Bolts:template").is_none());
    assert_eq!(f.scene.objects_in(bolts), vec![bolt]);
}

#[test]
fn mirrored_half_is_rebuilt_without_seam_duplicates() {
    let mut f = Fixture::new();
    let mut mesh = builders::quad_grid(1, 1, 1.0);
    let faces: Vec<FaceKey> = mesh.face_keys().collect();
    mesh.set_face_mirror(&faces, true);
    let world = translation(3.0, 0.0, 0.0)
        * Rotation3::from_euler_angles(0.0, 0.0, 0.8).to_homogeneous()
        * Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 1.0, 1.0));
    let half = f.mesh("Half", mesh, None, world);

    sets::low::build(&mut f.scene, &Settings::default()).unwrap();
    let low = f.scene.find_object("Half_low").unwrap();
    let data = f.scene.object_mesh(low).unwrap();
    assert_eq!(data.mesh.face_count(), 2);
    assert_eq!(data.mesh.vertex_count(), 6);
    assert_eq!(data.mesh.coincident_vertex_count(1e-9), 0);
    assert_eq!(data.materials, vec!["UDIM_0"]);

    let local: Vec<Point3<f64>> = data
        .mesh
        .vertex_keys()
        .filter_map(|v| data.mesh.position(v))
        .collect();
    assert!(local.iter().any(|p| (p - Point3::new(-1.0, 1.0, 0.0)).norm() < 1e-6));

    let mirrored = data
        .mesh
        .face_keys()
        .any(|f| data.mesh.face(f).unwrap().corners.iter().all(|c| c.uv.x >= 1.0));
    assert!(mirrored);

    let modifiers = &f.scene.object(low).unwrap().modifiers;
    assert_eq!(modifiers.last().map(|m| m.name.as_str()), Some("Triangulate (GFlow)"));

    // the source keeps its half and its tag
    let source = &f.scene.object_mesh(half).unwrap().mesh;
    assert_eq!(source.face_count(), 1);
    assert!(source.layer::<gamiflow_mesh::tags::FaceMirror>().is_some_and(|l| !l.is_empty()));
}

#[test]
fn painter_edges_stay_in_low_and_leave_export() {
    let mut f = Fixture::new();
    let mut mesh = builders::quad_grid(2, 1, 1.0);
    let middle: Vec<EdgeKey> = mesh
        .edge_keys()
        .filter(|e| mesh.edge_face_count(*e) == 2)
        .collect();
    mesh.set_edge_level(&middle, gamiflow_mesh::tags::PAINTER);
    f.mesh("Panel", mesh, None, Matrix4::identity());

    let settings = Settings::default();
    sets::low::build(&mut f.scene, &settings).unwrap();
    sets::export::build(&mut f.scene, &settings).unwrap();

    let low = f.scene.find_object("Panel_low").unwrap();
    assert_eq!(f.scene.object_mesh(low).unwrap().mesh.face_count(), 2);
    let export = f.scene.find_object("Panel_e").unwrap();
    // one quad left, triangulated
    assert_eq!(f.scene.object_mesh(export).unwrap().mesh.face_count(), 2);
}
