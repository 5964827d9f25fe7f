/// Geometry primitives shared by the STL reader and the scene
use std::collections::{HashMap, HashSet};

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

/// A 3D vertex with position and the normal of the facet it came from
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Facet normal as stored in the file (all three vertices share it)
    pub fn stored_normal(&self) -> Vector3<f32> {
        self.vertices[0].normal
    }

    /// Calculate the face normal from the triangle's vertices.
    ///
    /// Returns `None` for degenerate (zero-area) triangles.
    pub fn calculate_normal(&self) -> Option<Vector3<f32>> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1.cross(&edge2).try_normalize(f32::EPSILON)
    }
}

/// Triangle soup as read from an STL file
#[derive(Debug, Clone)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Weld identical positions into a shared point list.
    ///
    /// Facet normals are kept only when the file carries at least one
    /// non-zero normal; a zero normal on an individual facet is then
    /// replaced by the normal computed from its winding.
    pub fn to_indexed(&self) -> ImportedMesh {
        let mut points = Vec::new();
        let mut lookup: HashMap<[u32; 3], u32> = HashMap::new();
        let mut faces = Vec::with_capacity(self.triangles.len());

        for triangle in &self.triangles {
            let mut face = [0u32; 3];
            for (corner, vertex) in face.iter_mut().zip(&triangle.vertices) {
                let p = vertex.position;
                let key = [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()];
                *corner = *lookup.entry(key).or_insert_with(|| {
                    points.push(p);
                    (points.len() - 1) as u32
                });
            }
            faces.push(face);
        }

        let has_normals = self
            .triangles
            .iter()
            .any(|t| t.stored_normal() != Vector3::zeros());

        let face_normals = if has_normals {
            self.triangles
                .iter()
                .map(|t| match t.stored_normal().try_normalize(f32::EPSILON) {
                    Some(n) => n,
                    None => t.calculate_normal().unwrap_or_else(Vector3::z),
                })
                .collect()
        } else {
            Vec::new()
        };

        ImportedMesh {
            faces,
            face_normals,
            points,
        }
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Indexed geometry produced by the STL reader; consumed once per import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMesh {
    pub faces: Vec<[u32; 3]>,
    /// One unit normal per face, or empty when the file carried none.
    pub face_normals: Vec<Vector3<f32>>,
    pub points: Vec<Point3<f32>>,
}

impl ImportedMesh {
    pub fn has_normals(&self) -> bool {
        !self.face_normals.is_empty()
    }
}

/// Geometry as held by a scene object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub points: Vec<Point3<f32>>,
    pub faces: Vec<[u32; 3]>,
    /// Per-corner custom normals, three per face, in face order.
    pub loop_normals: Option<Vec<Vector3<f32>>>,
    pub smooth: bool,
}

impl MeshData {
    /// Build scene geometry from an import, baking `matrix` into the points.
    ///
    /// Face normals are expanded so each corner of a triangle carries its
    /// face's normal; such meshes are shaded smooth so the custom normals
    /// take effect. Without normals the mesh is flat shaded.
    pub fn from_import(imported: &ImportedMesh, matrix: &Matrix4<f32>) -> Self {
        let points = imported
            .points
            .iter()
            .map(|p| matrix.transform_point(p))
            .collect();

        let loop_normals = imported.has_normals().then(|| {
            let normal_matrix = normal_matrix(matrix);
            imported
                .face_normals
                .iter()
                .flat_map(|n| {
                    let n = (normal_matrix * n).try_normalize(f32::EPSILON).unwrap_or(*n);
                    [n, n, n]
                })
                .collect::<Vec<_>>()
        });

        let mut mesh = Self {
            points,
            faces: imported.faces.clone(),
            smooth: loop_normals.is_some(),
            loop_normals,
        };
        mesh.validate();
        mesh
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Drop faces that reference missing points, repeat a point, or
    /// duplicate an earlier face. Loop normals of dropped faces go with
    /// them. Returns the number of faces removed.
    pub fn validate(&mut self) -> usize {
        let point_count = self.points.len() as u32;
        let mut seen = HashSet::new();
        let mut keep = Vec::with_capacity(self.faces.len());

        for face in &self.faces {
            let [a, b, c] = *face;
            let in_range = a < point_count && b < point_count && c < point_count;
            let distinct = a != b && b != c && a != c;
            let mut sorted = *face;
            sorted.sort_unstable();
            keep.push(in_range && distinct && seen.insert(sorted));
        }

        let removed = keep.iter().filter(|k| !**k).count();
        if removed == 0 {
            return 0;
        }

        let mut flags = keep.iter();
        self.faces.retain(|_| *flags.next().unwrap_or(&false));

        if let Some(normals) = self.loop_normals.as_mut() {
            let mut corner = 0usize;
            normals.retain(|_| {
                let kept = keep.get(corner / 3).copied().unwrap_or(false);
                corner += 1;
                kept
            });
        }

        removed
    }
}

/// Inverse-transpose of the linear part, used to carry normals through `matrix`
fn normal_matrix(matrix: &Matrix4<f32>) -> Matrix3<f32> {
    let linear: Matrix3<f32> = matrix.fixed_view::<3, 3>(0, 0).into_owned();
    linear
        .try_inverse()
        .map(|inverse| inverse.transpose())
        .unwrap_or(linear)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{Axis, TransformConfig};

    fn quad(normal: (f32, f32, f32)) -> Mesh {
        let (nx, ny, nz) = normal;
        let mut mesh = Mesh::new();
        mesh.add_triangle(Triangle::new(
            Vertex::new(0.0, 0.0, 0.0, nx, ny, nz),
            Vertex::new(1.0, 0.0, 0.0, nx, ny, nz),
            Vertex::new(1.0, 1.0, 0.0, nx, ny, nz),
        ));
        mesh.add_triangle(Triangle::new(
            Vertex::new(0.0, 0.0, 0.0, nx, ny, nz),
            Vertex::new(1.0, 1.0, 0.0, nx, ny, nz),
            Vertex::new(0.0, 1.0, 0.0, nx, ny, nz),
        ));
        mesh
    }

    #[test]
    fn test_to_indexed_welds_shared_points() {
        let imported = quad((0.0, 0.0, 0.0)).to_indexed();
        assert_eq!(imported.points.len(), 4);
        assert_eq!(imported.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert!(!imported.has_normals());
    }

    #[test]
    fn test_to_indexed_keeps_normals() {
        let imported = quad((0.0, 0.0, 2.0)).to_indexed();
        assert_eq!(imported.face_normals.len(), 2);
        assert!((imported.face_normals[0] - Vector3::z()).norm() < 1e-6);
    }

    #[test]
    fn test_calculate_normal_degenerate() {
        let t = Triangle::new(
            Vertex::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            Vertex::new(2.0, 0.0, 0.0, 0.0, 0.0, 0.0),
        );
        assert!(t.calculate_normal().is_none());
    }

    #[test]
    fn test_from_import_expands_loop_normals() {
        let imported = quad((0.0, 0.0, 1.0)).to_indexed();
        let mesh = MeshData::from_import(&imported, &Matrix4::identity());
        let normals = mesh.loop_normals.as_ref().unwrap();
        assert_eq!(normals.len(), 6);
        assert!(normals.iter().all(|n| (n - Vector3::z()).norm() < 1e-6));
        assert!(mesh.smooth);
    }

    #[test]
    fn test_from_import_rotates_normals_with_default_axes() {
        let imported = quad((0.0, 0.0, 1.0)).to_indexed();
        let matrix = TransformConfig::default().matrix().unwrap();
        let mesh = MeshData::from_import(&imported, &matrix);

        // Z-forward becomes +Y; scaling must not shorten the normals.
        let normals = mesh.loop_normals.as_ref().unwrap();
        assert_eq!(normals.len(), 6);
        for n in normals {
            assert!((n - Vector3::y()).norm() < 1e-6, "normal {:?}", n);
        }
        assert!((mesh.points[1] - Point3::new(-0.001, 0.0, 0.0)).norm() < 1e-7);
        assert!((mesh.points[2] - Point3::new(-0.001, 0.0, 0.001)).norm() < 1e-7);
    }

    #[test]
    fn test_from_import_rotates_normals_with_custom_axes() {
        let config = TransformConfig::new(Axis::X, Axis::NegZ, 2.0);
        let matrix = config.matrix().unwrap();

        let up = MeshData::from_import(&quad((0.0, 0.0, 1.0)).to_indexed(), &matrix);
        for n in up.loop_normals.as_ref().unwrap() {
            assert!((n - Vector3::new(0.0, -1.0, 0.0)).norm() < 1e-6, "normal {:?}", n);
        }

        let side = MeshData::from_import(&quad((1.0, 0.0, 0.0)).to_indexed(), &matrix);
        for n in side.loop_normals.as_ref().unwrap() {
            assert!((n - Vector3::z()).norm() < 1e-6, "normal {:?}", n);
        }
        assert!((up.points[1] - Point3::new(0.0, 0.0, 2.0)).norm() < 1e-6);
    }

    #[test]
    fn test_from_import_without_normals_is_flat() {
        let imported = quad((0.0, 0.0, 0.0)).to_indexed();
        let mesh = MeshData::from_import(&imported, &Matrix4::new_scaling(2.0));
        assert!(mesh.loop_normals.is_none());
        assert!(!mesh.smooth);
        assert_eq!(mesh.points[2], Point3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn test_validate_drops_bad_faces_and_their_normals() {
        let mut mesh = MeshData {
            points: vec![Point3::origin(); 3],
            faces: vec![[0, 1, 2], [0, 0, 1], [0, 1, 7], [2, 1, 0]],
            loop_normals: Some(
                (0..12)
                    .map(|i| Vector3::new(i as f32, 0.0, 0.0))
                    .collect(),
            ),
            smooth: true,
        };
        assert_eq!(mesh.validate(), 3);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
        let normals = mesh.loop_normals.unwrap();
        assert_eq!(normals.len(), 3);
        assert_eq!(normals[2].x, 2.0);
    }
}
