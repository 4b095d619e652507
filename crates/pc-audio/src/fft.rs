use realfft::RealFftPlanner;
use realfft::num_complex::Complex;

/// FFT pipeline: windowed real FFT using realfft.
///
/// Pre-allocates the FFT plan and scratch buffers for zero-allocation hot path.
///
/// # Example
/// ```
/// use pc_audio::fft::FftPipeline;
/// let fft = FftPipeline::new(1024);
/// assert_eq!(fft.num_bins(), 513);
/// ```
pub struct FftPipeline {
    fft_size: usize,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    plan: std::sync::Arc<dyn realfft::RealToComplex<f32>>,
    /// Periodic Hann window coefficients.
    window: Vec<f32>,
}

impl FftPipeline {
    /// Create a new FFT pipeline with the given frame size.
    ///
    /// # Panics
    /// Panics if `size` is 0.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "FFT size must be > 0");

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        // Hann périodique (fftbins), comme les MFCC d'entraînement
        let window: Vec<f32> = (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
            .collect();

        Self {
            fft_size: size,
            input_buf,
            spectrum_buf,
            scratch,
            plan,
            window,
        }
    }

    /// Power spectrum `|X[k]|²` of one frame into `out` (N/2+1 bins).
    ///
    /// `frame` shorter than the FFT size is zero-padded.
    ///
    /// # Errors
    /// Returns the realfft error message if the transform fails.
    ///
    /// # Example
    /// ```
    /// use pc_audio::fft::FftPipeline;
    /// let mut fft = FftPipeline::new(256);
    /// let mut power = vec![0.0f32; fft.num_bins()];
    /// fft.power_spectrum(&[0.0; 256], &mut power).unwrap();
    /// assert!(power.iter().all(|&p| p == 0.0));
    /// ```
    pub fn power_spectrum(&mut self, frame: &[f32], out: &mut [f32]) -> Result<(), String> {
        let n = self.fft_size.min(frame.len());

        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n { frame[i] * self.window[i] } else { 0.0 };
        }

        self.plan
            .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
            .map_err(|e| e.to_string())?;

        for (slot, c) in out.iter_mut().zip(&self.spectrum_buf) {
            *slot = c.re * c.re + c.im * c.im;
        }
        Ok(())
    }

    /// FFT frame size.
    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of spectrum bins, `N/2 + 1`.
    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }
}
