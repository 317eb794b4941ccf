//! Toeplitz-plus-Hankel linear system solver.
//!
//! Solves `(T + H) a = b` with `T[i][j] = t[|i - j|]` and `H[i][j] = h[i + j]` by a block Levinson
//! recursion over 2x2 blocks.

/// 2x2 matrix, row major.
type Mat2 = [f64; 4];
type Vec2 = [f64; 2];

#[inline]
fn mv_mul(x: &Mat2, y: &Vec2) -> Vec2 {
    [x[0] * y[0] + x[1] * y[1], x[2] * y[0] + x[3] * y[1]]
}

#[inline]
fn mm_mul(x: &Mat2, y: &Mat2) -> Mat2 {
    [
        x[0] * y[0] + x[1] * y[2],
        x[0] * y[1] + x[1] * y[3],
        x[2] * y[0] + x[3] * y[2],
        x[2] * y[1] + x[3] * y[3],
    ]
}

/// Exchange both rows and columns.
#[inline]
fn cross(x: &Mat2) -> Mat2 {
    [x[3], x[2], x[1], x[0]]
}

/// The normal matrix is (numerically) singular.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Singular {
    pub determinant: f64,
}

#[inline]
fn inverse(y: &Mat2, eps: f64) -> Result<Mat2, Singular> {
    let det = y[0] * y[3] - y[1] * y[2];
    if det.abs() < eps || det.is_nan() {
        return Err(Singular { determinant: det });
    }
    Ok([y[3] / det, -y[1] / det, -y[2] / det, y[0] / det])
}

/// Solver workspace for systems up to a fixed order.
#[derive(Debug, Clone)]
pub(crate) struct ToeplitzHankel {
    r: Vec<Mat2>,
    x: Vec<Mat2>,
    xx: Vec<Mat2>,
    p: Vec<Vec2>,
    eps: f64,
}

impl ToeplitzHankel {
    /// `eps`: smallest accepted determinant of a 2x2 block; negative selects `1e-6`.
    pub fn new(n: usize, eps: f64) -> Self {
        Self {
            r: vec![[0.0; 4]; n],
            x: vec![[0.0; 4]; n],
            xx: vec![[0.0; 4]; n],
            p: vec![[0.0; 2]; n],
            eps: if eps < 0.0 { 1.0e-6 } else { eps },
        }
    }

    /// `t.len() >= n`, `h.len() >= 2n - 1`, `b.len() == a.len() == n`
    pub fn solve(&mut self, t: &[f64], h: &[f64], b: &[f64], a: &mut [f64]) -> Result<(), Singular> {
        let n = a.len();
        if n == 0 {
            return Ok(());
        }
        debug_assert!(n <= self.r.len());
        debug_assert_eq!(b.len(), n);
        let eps = self.eps;

        for i in 0..n {
            self.r[i] = [t[i], h[n - 1 + i], h[n - 1 - i], t[i]];
            self.x[i] = [0.0; 4];
            self.xx[i] = [0.0; 4];
            self.p[i] = [0.0; 2];
        }

        self.x[0] = [1.0, 0.0, 0.0, 1.0];
        self.p[0] = mv_mul(&inverse(&self.r[0], eps)?, &[b[0], b[n - 1]]);
        let mut vx = self.r[0];

        for i in 1..n {
            let mut ex = [0.0; 4];
            let mut ep = [0.0; 2];
            for j in 0..i {
                let t = mm_mul(&self.r[i - j], &self.x[j]);
                ex.iter_mut().zip(t).for_each(|(e, t)| *e += t);
                let t = mv_mul(&self.r[i - j], &self.p[j]);
                ep.iter_mut().zip(t).for_each(|(e, t)| *e += t);
            }

            let bx = mm_mul(&inverse(&cross(&vx), eps)?, &ex);

            for j in 1..i {
                let s = mm_mul(&cross(&self.xx[i - j]), &bx);
                self.x[j].iter_mut().zip(s).for_each(|(x, s)| *x -= s);
            }
            self.xx[1..i].copy_from_slice(&self.x[1..i]);
            let neg = bx.map(|v| -v);
            self.x[i] = neg;
            self.xx[i] = neg;

            let s = mm_mul(&cross(&ex), &bx);
            vx.iter_mut().zip(s).for_each(|(v, s)| *v -= s);

            let g = mv_mul(
                &inverse(&cross(&vx), eps)?,
                &[b[i] - ep[0], b[n - 1 - i] - ep[1]],
            );

            for j in 0..i {
                let s = mv_mul(&cross(&self.x[i - j]), &g);
                self.p[j][0] += s[0];
                self.p[j][1] += s[1];
            }
            self.p[i] = g;
        }

        for (a, p) in a.iter_mut().zip(&self.p) {
            *a = p[0];
        }
        Ok(())
    }
}
