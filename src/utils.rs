/*
    Nyx, blazing fast astrodynamics
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use nalgebra::storage::Storage;
use nalgebra::{Dim, Matrix, Matrix3, Vector3};

/// Returns the tilde matrix from the provided Vector3.
pub fn tilde_matrix(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0,
        -v[(2, 0)],
        v[(1, 0)],
        v[(2, 0)],
        0.0,
        -v[(0, 0)],
        -v[(1, 0)],
        v[(0, 0)],
        0.0,
    )
}

/// Returns whether the provided matrix is square and symmetric, within a tolerance relative to the largest entry.
pub fn is_symmetric<R: Dim, C: Dim, S: Storage<f64, R, C>>(
    m: &Matrix<f64, R, C, S>,
    rel_tolerance: f64,
) -> bool {
    if !m.is_square() {
        return false;
    }
    let scale = m.amax().max(1.0);
    for i in 1..m.nrows() {
        for j in 0..i {
            if (m[(i, j)] - m[(j, i)]).abs() > rel_tolerance * scale {
                return false;
            }
        }
    }
    true
}
