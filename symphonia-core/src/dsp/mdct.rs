// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `mdct` module implements the Inverse Modified Discrete Cosine Transform (IMDCT) in terms
//! of a half-length complex FFT.

use std::sync::Arc;

use rustfft::num_complex::Complex;

/// The Inverse Modified Discrete Cosine Transform (IMDCT).
pub struct Imdct {
    fft: Arc<dyn rustfft::Fft<f32>>,
    fft_scratch: Box<[Complex<f32>]>,
    scratch: Box<[Complex<f32>]>,
    twiddle: Box<[Complex<f32>]>,
}

impl Imdct {
    /// Instantiate a N-point IMDCT with no scaling.
    ///
    /// The value of `n` is the number of spectral samples and must be a power-of-two.
    pub fn new(n: usize) -> Self {
        Imdct::new_scaled(n, 1.0)
    }

    /// Instantiate a N-point IMDCT with scaling.
    ///
    /// The value of `n` is the number of spectral samples and must be a power-of-two. A negative
    /// `scale` additionally negates the odd-indexed output half, matching WMA's convention for
    /// the second half of a transform window.
    pub fn new_scaled(n: usize, scale: f64) -> Self {
        assert!(n.is_power_of_two(), "n must be a power of two");

        let n2 = n / 2;

        let mut twiddle = Vec::with_capacity(n2);

        let alpha = 1.0 / 8.0 + if scale.is_sign_positive() { 0.0 } else { n2 as f64 };
        let pi_n = std::f64::consts::PI / n as f64;
        let sqrt_scale = scale.abs().sqrt();

        for k in 0..n2 {
            let theta = pi_n * (alpha + k as f64);
            let re = sqrt_scale * theta.cos();
            let im = sqrt_scale * theta.sin();
            twiddle.push(Complex::new(re as f32, im as f32));
        }

        let mut planner = rustfft::FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n2);

        let fft_scratch =
            vec![Default::default(); fft.get_inplace_scratch_len()].into_boxed_slice();
        let scratch = vec![Default::default(); n2].into_boxed_slice();

        Imdct { fft, fft_scratch, scratch, twiddle: twiddle.into_boxed_slice() }
    }

    /// Performs the N-point Inverse Modified Discrete Cosine Transform.
    ///
    /// `spec` must contain exactly N spectral samples, and `out` must have length 2N. Panics if
    /// either length requirement is violated.
    pub fn imdct(&mut self, spec: &[f32], out: &mut [f32]) {
        let n = self.fft.len() << 1;
        let n2 = n >> 1;
        let n4 = n >> 2;

        assert_eq!(spec.len(), n);
        assert_eq!(out.len(), 2 * n);

        for (i, (&w, t)) in self.twiddle.iter().zip(self.scratch.iter_mut()).enumerate() {
            let even = spec[i * 2];
            let odd = -spec[n - 1 - i * 2];

            let re = odd * w.im - even * w.re;
            let im = odd * w.re + even * w.im;
            *t = Complex::new(re, im);
        }

        self.fft.process_with_scratch(&mut self.scratch, &mut self.fft_scratch);

        let (vec0, vec1) = out.split_at_mut(n2);
        let (vec1, vec2) = vec1.split_at_mut(n2);
        let (vec2, vec3) = vec2.split_at_mut(n2);

        for (i, (x, &w)) in self.scratch[..n4].iter().zip(self.twiddle[..n4].iter()).enumerate() {
            let val = w * x.conj();

            let fi = 2 * i;
            let ri = n2 - 1 - 2 * i;

            vec0[ri] = -val.im;
            vec1[fi] = val.im;
            vec2[ri] = val.re;
            vec3[fi] = val.re;
        }

        for (i, (x, &w)) in self.scratch[n4..].iter().zip(self.twiddle[n4..].iter()).enumerate() {
            let val = w * x.conj();

            let fi = 2 * i;
            let ri = n2 - 1 - 2 * i;

            vec0[fi] = -val.re;
            vec1[ri] = val.re;
            vec2[fi] = val.im;
            vec3[ri] = val.im;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imdct_analytical(x: &[f32], y: &mut [f32], scale: f64) {
        assert!(y.len() == 2 * x.len());

        let sqrt_scale = scale.abs().sqrt();
        let sign = if scale.is_sign_positive() { 1.0 } else { -1.0 };
        let n = x.len();
        let n2 = (2 * n) as f64;

        for (i, yi) in y.iter_mut().enumerate() {
            let mut sum = 0.0;
            for (k, &xk) in x.iter().enumerate() {
                let a = std::f64::consts::PI / n2 * (2.0 * i as f64 + 1.0 + n as f64)
                    * (2.0 * k as f64 + 1.0);
                sum += xk as f64 * a.cos();
            }
            *yi = (sign * sqrt_scale * sum) as f32;
        }
    }

    #[test]
    fn verify_imdct() {
        const N: usize = 64;

        let mut src = [0f32; N];
        for (i, s) in src.iter_mut().enumerate() {
            *s = ((i * 7 % N) as f32 / N as f32) - 0.5;
        }

        let mut expected = [0f32; 2 * N];
        imdct_analytical(&src, &mut expected, 1.0);

        let mut actual = [0f32; 2 * N];
        let mut imdct = Imdct::new(N);
        imdct.imdct(&src, &mut actual);

        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 0.5, "a={}, e={}", a, e);
        }
    }
}
