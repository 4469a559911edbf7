use nalgebra::{Matrix4, Vector3};

/// World-space position in metres
pub type Vec3 = Vector3<f32>;

/// Camera-to-world rigid transform
pub type Transform = Matrix4<f32>;

/// Flatten a transform into four rows of four floats
pub fn rows_from_transform(transform: &Transform) -> [[f32; 4]; 4] {
    let mut rows = [[0.0; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, value) in row.iter_mut().enumerate() {
            *value = transform[(r, c)];
        }
    }
    rows
}

/// Rebuild a transform from row-major storage
pub fn transform_from_rows(rows: &[[f32; 4]; 4]) -> Transform {
    Matrix4::from_fn(|r, c| rows[r][c])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_row_major() {
        let mut transform = Transform::identity();
        transform[(0, 3)] = 1.5;
        transform[(1, 3)] = -2.0;
        transform[(2, 3)] = 0.25;

        let rows = rows_from_transform(&transform);

        // translation lives in the last column of each row
        assert_eq!(rows[0], [1.0, 0.0, 0.0, 1.5]);
        assert_eq!(rows[1], [0.0, 1.0, 0.0, -2.0]);
        assert_eq!(rows[2], [0.0, 0.0, 1.0, 0.25]);
        assert_eq!(rows[3], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(transform_from_rows(&rows), transform);
    }
}
