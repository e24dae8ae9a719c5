// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion dispatcher.
//
// A validated `ConversionRequest` is routed by format family: documents
// (PNG, JPG, PDF) go through the image codecs and the page rasterizer,
// vector data (GeoJSON, Shapefile) goes through the feature drivers.
// Identity requests copy the input unchanged.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use wandler_core::error::{Result, WandlerError};
use wandler_core::{ConversionRequest, ConverterConfig, FormatTag};

use crate::acquire::acquire;
use crate::archive;
use crate::image::ImageProcessor;
use crate::pdf::{PageRasterizer, PdfWriter, PopplerRasterizer};
use crate::vector::{self, json, shp};

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    /// Where the result ended up. Differs from the requested export path
    /// when Shapefile output is packaged as a zip.
    pub export_path: PathBuf,
    /// Every file written, in write order.
    pub outputs: Vec<PathBuf>,
}

impl Completed {
    fn single(path: PathBuf) -> Self {
        Self {
            export_path: path.clone(),
            outputs: vec![path],
        }
    }
}

/// Runs conversion requests with one configuration and one page rasterizer.
pub struct Converter<R: PageRasterizer = PopplerRasterizer> {
    config: ConverterConfig,
    rasterizer: R,
}

impl Converter<PopplerRasterizer> {
    /// Converter using `pdftoppm` as configured.
    pub fn new(config: ConverterConfig) -> Self {
        let rasterizer = PopplerRasterizer::from_config(&config);
        Self { config, rasterizer }
    }
}

impl<R: PageRasterizer> Converter<R> {
    pub fn with_rasterizer(config: ConverterConfig, rasterizer: R) -> Self {
        Self { config, rasterizer }
    }

    /// Convert without progress reporting.
    pub fn convert(&self, request: &ConversionRequest) -> Result<Completed> {
        self.convert_with_progress(request, &mut |_| {})
    }

    /// Convert, reporting percent complete (0 to 100) through `progress`.
    ///
    /// Outputs written before a failure are left in place.
    #[instrument(skip_all, fields(
        from = %request.source_format(),
        to = %request.target_format(),
        input = %request.source_path().display()
    ))]
    pub fn convert_with_progress(
        &self,
        request: &ConversionRequest,
        progress: &mut dyn FnMut(f64),
    ) -> Result<Completed> {
        if request.is_identity() {
            return copy_unchanged(request, progress);
        }

        let input = acquire(request.source_path(), request.source_format())?;
        if let Some(dir) = input.extraction_dir() {
            debug!(
                dir = %dir.display(),
                input = %input.path().display(),
                "Reading extracted archive"
            );
        }
        let export = request.export_path();
        let target = request.target_format();

        let completed = match request.source_format() {
            FormatTag::Pdf => self.rasterize_pdf(input.path(), export, target, progress)?,
            source @ (FormatTag::Png | FormatTag::Jpg) => {
                self.convert_image(input.path(), source, export, target, progress)?
            }
            source @ (FormatTag::GeoJson | FormatTag::Shp) => {
                convert_vector(input.path(), source, export, target, progress)?
            }
        };

        info!(
            export = %completed.export_path.display(),
            files = completed.outputs.len(),
            "Conversion complete"
        );
        Ok(completed)
    }

    // -- Document family ------------------------------------------------------

    fn rasterize_pdf(
        &self,
        pdf: &Path,
        export: &Path,
        target: FormatTag,
        progress: &mut dyn FnMut(f64),
    ) -> Result<Completed> {
        if !matches!(target, FormatTag::Png | FormatTag::Jpg) {
            return Err(WandlerError::UnsupportedConversion {
                from: FormatTag::Pdf,
                to: target,
            });
        }

        let total = self.rasterizer.page_count(pdf)?;
        if total == 0 {
            return Err(WandlerError::PdfError(format!(
                "{} has no pages",
                pdf.display()
            )));
        }
        info!(pages = total, "Rasterizing PDF");

        let mut outputs = Vec::with_capacity(total);
        for index in 0..total {
            let page = u32::try_from(index + 1).map_err(|_| {
                WandlerError::PdfError(format!("page number {} out of range", index + 1))
            })?;
            let rendered = ImageProcessor::from_dynamic(self.rasterizer.render_page(pdf, page)?);

            let out = if total == 1 {
                export.to_path_buf()
            } else {
                page_output_path(export, index, target)
            };
            self.write_image(&rendered, &out, FormatTag::Pdf, target)?;
            debug!(page, out = %out.display(), "Page written");
            outputs.push(out);

            progress((index + 1) as f64 / total as f64 * 100.0);
        }

        Ok(Completed {
            export_path: export.to_path_buf(),
            outputs,
        })
    }

    fn convert_image(
        &self,
        input: &Path,
        source: FormatTag,
        export: &Path,
        target: FormatTag,
        progress: &mut dyn FnMut(f64),
    ) -> Result<Completed> {
        let image = ImageProcessor::open(input)?;
        self.write_image(&image, export, source, target)?;
        progress(100.0);
        Ok(Completed::single(export.to_path_buf()))
    }

    fn write_image(
        &self,
        image: &ImageProcessor,
        out: &Path,
        source: FormatTag,
        target: FormatTag,
    ) -> Result<()> {
        match target {
            FormatTag::Png => image.save_png(out),
            FormatTag::Jpg => image.save_jpeg(out, self.config.jpeg_quality),
            FormatTag::Pdf => {
                let mut writer = PdfWriter::new(self.config.pdf_resolution_dpi);
                if let Some(stem) = out.file_stem().and_then(|s| s.to_str()) {
                    writer.set_title(stem);
                }
                writer.write_image_to_file(image.as_dynamic(), out)
            }
            other => Err(WandlerError::UnsupportedConversion {
                from: source,
                to: other,
            }),
        }
    }
}

/// `{export}_{index}.{ext}`, appended to the whole export path.
fn page_output_path(export: &Path, index: usize, target: FormatTag) -> PathBuf {
    let mut name = OsString::from(export.as_os_str());
    name.push(format!("_{}.{}", index, target.extension()));
    PathBuf::from(name)
}

// -- Vector family ------------------------------------------------------------

fn convert_vector(
    input: &Path,
    source: FormatTag,
    export: &Path,
    target: FormatTag,
    progress: &mut dyn FnMut(f64),
) -> Result<Completed> {
    let collection = vector::read(input, source)?;

    let completed = match target {
        FormatTag::GeoJson => {
            json::write(&collection, export)?;
            Completed::single(export.to_path_buf())
        }
        FormatTag::Shp => {
            let shp_path = export.with_extension("shp");
            let written: Vec<PathBuf> = shp::write(&collection, &shp_path)?
                .into_iter()
                .filter(|p| p.is_file())
                .collect();

            let zip_path = export.with_extension("zip");
            archive::package(&written, &zip_path)?;
            for sidecar in &written {
                std::fs::remove_file(sidecar)?;
            }
            Completed::single(zip_path)
        }
        other => {
            return Err(WandlerError::UnsupportedConversion {
                from: source,
                to: other,
            });
        }
    };

    progress(100.0);
    Ok(completed)
}

// -- Identity -----------------------------------------------------------------

fn copy_unchanged(request: &ConversionRequest, progress: &mut dyn FnMut(f64)) -> Result<Completed> {
    let source = request.source_path();
    let export = request.export_path();

    if !source.is_file() {
        return Err(WandlerError::UserInput(format!(
            "input file not found: {}",
            source.display()
        )));
    }

    if same_file(source, export) {
        debug!("Source and export are the same file, nothing to copy");
    } else {
        std::fs::copy(source, export)?;
    }

    progress(100.0);
    Ok(Completed::single(export.to_path_buf()))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// -- Run state ----------------------------------------------------------------

/// Lifecycle of a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionState {
    Idle,
    Running,
    Completed(Completed),
    Failed(String),
}

/// One request and where it is in its lifecycle. A run executes at most once.
#[derive(Debug)]
pub struct ConversionRun {
    request: ConversionRequest,
    state: ConversionState,
}

impl ConversionRun {
    pub fn new(request: ConversionRequest) -> Self {
        Self {
            request,
            state: ConversionState::Idle,
        }
    }

    pub fn request(&self) -> &ConversionRequest {
        &self.request
    }

    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    /// Execute the request. Fails with [`WandlerError::AlreadyRun`] unless
    /// the run is still idle.
    pub fn run<R: PageRasterizer>(
        &mut self,
        converter: &Converter<R>,
        progress: &mut dyn FnMut(f64),
    ) -> Result<Completed> {
        if self.state != ConversionState::Idle {
            return Err(WandlerError::AlreadyRun);
        }

        self.state = ConversionState::Running;
        match converter.convert_with_progress(&self.request, progress) {
            Ok(completed) => {
                self.state = ConversionState::Completed(completed.clone());
                Ok(completed)
            }
            Err(err) => {
                warn!(error = %err, class = ?err.class(), "Conversion failed");
                self.state = ConversionState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Status line for the user: "Complete", the error message, or empty
    /// while nothing has finished.
    pub fn status_text(&self) -> &str {
        match &self.state {
            ConversionState::Completed(_) => "Complete",
            ConversionState::Failed(message) => message,
            ConversionState::Idle | ConversionState::Running => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PdfReader;
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
    use std::fs::File;
    use std::io::Write;
    use zip::ZipArchive;

    /// Rasterizer returning solid RGBA pages without touching the file.
    struct FakeRasterizer {
        pages: usize,
    }

    impl PageRasterizer for FakeRasterizer {
        fn page_count(&self, _pdf: &Path) -> Result<usize> {
            Ok(self.pages)
        }

        fn render_page(&self, _pdf: &Path, page: u32) -> Result<DynamicImage> {
            let shade = (page * 40) as u8;
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                12,
                8,
                Rgba([shade, 0, 0, 128]),
            )))
        }
    }

    fn fake(pages: usize) -> Converter<FakeRasterizer> {
        Converter::with_rasterizer(ConverterConfig::default(), FakeRasterizer { pages })
    }

    fn placeholder_pdf(dir: &Path) -> PathBuf {
        let path = dir.join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();
        path
    }

    fn sample_png(dir: &Path) -> PathBuf {
        let path = dir.join("photo.png");
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 9, Rgb([10, 200, 30])));
        ImageProcessor::from_dynamic(image).save_png(&path).unwrap();
        path
    }

    const POINTS: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        { "type": "Feature", "geometry": { "type": "Point", "coordinates": [13.4, 52.5] },
          "properties": { "name": "Berlin", "pop": 3645000 } },
        { "type": "Feature", "geometry": { "type": "Point", "coordinates": [2.35, 48.85] },
          "properties": { "name": "Paris", "pop": 2161000 } }
      ]
    }"#;

    #[test]
    fn single_page_pdf_writes_export_path() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = placeholder_pdf(dir.path());
        let export = dir.path().join("page.png");
        let request = ConversionRequest::new(&pdf, &export, FormatTag::Pdf, FormatTag::Png).unwrap();

        let done = fake(1).convert(&request).unwrap();

        assert_eq!(done.outputs, vec![export.clone()]);
        let image = image::open(&export).unwrap();
        assert_eq!((image.width(), image.height()), (12, 8));
    }

    #[test]
    fn multi_page_pdf_writes_numbered_rgb_jpegs() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = placeholder_pdf(dir.path());
        let export = dir.path().join("out.jpg");
        let request = ConversionRequest::new(&pdf, &export, FormatTag::Pdf, FormatTag::Jpg).unwrap();

        let done = fake(3).convert(&request).unwrap();

        let expected: Vec<PathBuf> = (0..3)
            .map(|i| dir.path().join(format!("out.jpg_{i}.jpg")))
            .collect();
        assert_eq!(done.outputs, expected);
        assert!(!export.exists());
        for path in &expected {
            let image = image::open(path).unwrap();
            assert!(matches!(image, DynamicImage::ImageRgb8(_)));
        }
    }

    #[test]
    fn pdf_progress_is_monotone_and_ends_at_100() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = placeholder_pdf(dir.path());
        let export = dir.path().join("pages");
        let request = ConversionRequest::new(&pdf, &export, FormatTag::Pdf, FormatTag::Png).unwrap();

        let mut seen = Vec::new();
        fake(4)
            .convert_with_progress(&request, &mut |p| seen.push(p))
            .unwrap();

        assert_eq!(seen.len(), 4);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 100.0);
    }

    #[test]
    fn pdf_without_pages_is_pdf_error() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = placeholder_pdf(dir.path());
        let request =
            ConversionRequest::new(&pdf, dir.path().join("x.png"), FormatTag::Pdf, FormatTag::Png)
                .unwrap();

        assert!(matches!(
            fake(0).convert(&request),
            Err(WandlerError::PdfError(_))
        ));
    }

    #[test]
    fn every_image_pair_produces_readable_output() {
        let dir = tempfile::tempdir().unwrap();
        let png = sample_png(dir.path());
        let jpg = dir.path().join("photo.jpg");
        ImageProcessor::open(&png).unwrap().save_jpeg(&jpg, 90).unwrap();

        let pairs = [
            (&png, FormatTag::Png, FormatTag::Jpg),
            (&png, FormatTag::Png, FormatTag::Pdf),
            (&jpg, FormatTag::Jpg, FormatTag::Png),
            (&jpg, FormatTag::Jpg, FormatTag::Pdf),
        ];

        for (i, (input, from, to)) in pairs.into_iter().enumerate() {
            let export = dir.path().join(format!("out{i}.{}", to.extension()));
            let request = ConversionRequest::new(input, &export, from, to).unwrap();
            let mut last = 0.0;
            fake(1)
                .convert_with_progress(&request, &mut |p| last = p)
                .unwrap();
            assert_eq!(last, 100.0);

            match to {
                FormatTag::Pdf => assert_eq!(PdfReader::open(&export).unwrap().page_count(), 1),
                _ => {
                    let image = image::open(&export).unwrap();
                    assert_eq!((image.width(), image.height()), (16, 9));
                }
            }
        }
    }

    #[test]
    fn geojson_to_shapefile_yields_zip_only() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cities.geojson");
        std::fs::write(&input, POINTS).unwrap();
        let export = dir.path().join("cities_out.shp");
        let request =
            ConversionRequest::new(&input, &export, FormatTag::GeoJson, FormatTag::Shp).unwrap();

        let done = fake(1).convert(&request).unwrap();

        let zip_path = dir.path().join("cities_out.zip");
        assert_eq!(done.export_path, zip_path);
        let archive = ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for member in ["cities_out.shp", "cities_out.shx", "cities_out.dbf"] {
            assert!(names.contains(&member), "missing {member} in {names:?}");
        }
        for ext in shp::SIDECAR_EXTENSIONS {
            assert!(!export.with_extension(ext).exists(), "loose .{ext} left behind");
        }
    }

    #[test]
    fn shapefile_round_trip_preserves_features() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cities.geojson");
        std::fs::write(&input, POINTS).unwrap();
        let zipped = fake(1)
            .convert(
                &ConversionRequest::new(
                    &input,
                    dir.path().join("cities"),
                    FormatTag::GeoJson,
                    FormatTag::Shp,
                )
                .unwrap(),
            )
            .unwrap()
            .export_path;

        let back = dir.path().join("back.geojson");
        let request =
            ConversionRequest::new(&zipped, &back, FormatTag::Shp, FormatTag::GeoJson).unwrap();
        fake(1).convert(&request).unwrap();

        let original = json::read(&input).unwrap();
        let restored = json::read(&back).unwrap();
        assert_eq!(restored.len(), original.len());
        for (a, b) in original.iter().zip(restored.iter()) {
            assert_eq!(
                a.geometry.as_ref().map(|g| g.type_name()),
                b.geometry.as_ref().map(|g| g.type_name())
            );
            let mut keys_a: Vec<_> = a.properties.keys().collect();
            let mut keys_b: Vec<_> = b.properties.keys().collect();
            keys_a.sort();
            keys_b.sort();
            assert_eq!(keys_a, keys_b);
        }
        assert_eq!(restored.features[1].properties["name"], "Paris");
    }

    #[test]
    fn geojson_with_null_geometry_survives_shapefile_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("stops.geojson");
        std::fs::write(
            &input,
            r#"{
              "type": "FeatureCollection",
              "features": [
                { "type": "Feature", "geometry": { "type": "Point", "coordinates": [1.0, 2.0] },
                  "properties": { "name": "a" } },
                { "type": "Feature", "geometry": null, "properties": { "name": "b" } },
                { "type": "Feature",
                  "geometry": { "type": "MultiPoint", "coordinates": [[3.0, 4.0], [5.0, 6.0]] },
                  "properties": { "name": "c" } }
              ]
            }"#,
        )
        .unwrap();
        let zipped = fake(1)
            .convert(
                &ConversionRequest::new(
                    &input,
                    dir.path().join("stops.shp"),
                    FormatTag::GeoJson,
                    FormatTag::Shp,
                )
                .unwrap(),
            )
            .unwrap()
            .export_path;

        let back = dir.path().join("back.geojson");
        let request =
            ConversionRequest::new(&zipped, &back, FormatTag::Shp, FormatTag::GeoJson).unwrap();
        fake(1).convert(&request).unwrap();

        let restored = json::read(&back).unwrap();
        assert_eq!(restored.len(), 3);
        let types: Vec<_> = restored
            .iter()
            .map(|f| f.geometry.as_ref().map(|g| g.type_name()))
            .collect();
        assert_eq!(types, vec![Some("MultiPoint"), None, Some("MultiPoint")]);
        assert_eq!(restored.features[1].properties["name"], "b");
    }

    #[test]
    fn unsupported_image_target_names_real_source() {
        let dir = tempfile::tempdir().unwrap();
        let image = ImageProcessor::open(sample_png(dir.path())).unwrap();

        let err = fake(1)
            .write_image(
                &image,
                &dir.path().join("x.geojson"),
                FormatTag::Pdf,
                FormatTag::GeoJson,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            WandlerError::UnsupportedConversion {
                from: FormatTag::Pdf,
                to: FormatTag::GeoJson
            }
        ));
    }

    #[test]
    fn zip_without_shapefile_leaves_export_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("nothing.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&input).unwrap());
            zip.start_file("notes.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"no layers here").unwrap();
            zip.finish().unwrap();
        }
        let export = dir.path().join("out.geojson");
        let request =
            ConversionRequest::new(&input, &export, FormatTag::Shp, FormatTag::GeoJson).unwrap();

        let err = fake(1).convert(&request).unwrap_err();

        assert!(matches!(err, WandlerError::UserInput(ref m) if m == "no shapefile in archive"));
        assert!(!export.exists());
    }

    #[test]
    fn identity_copies_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let png = sample_png(dir.path());
        let export = dir.path().join("copy.png");
        let request = ConversionRequest::new(&png, &export, FormatTag::Png, FormatTag::Png).unwrap();

        fake(1).convert(&request).unwrap();

        assert_eq!(std::fs::read(&png).unwrap(), std::fs::read(&export).unwrap());
    }

    #[test]
    fn identity_onto_itself_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let png = sample_png(dir.path());
        let before = std::fs::read(&png).unwrap();
        let request = ConversionRequest::new(&png, &png, FormatTag::Png, FormatTag::Png).unwrap();

        fake(1).convert(&request).unwrap();

        assert_eq!(std::fs::read(&png).unwrap(), before);
    }

    #[test]
    fn run_completes_once() {
        let dir = tempfile::tempdir().unwrap();
        let png = sample_png(dir.path());
        let request =
            ConversionRequest::new(&png, dir.path().join("a.jpg"), FormatTag::Png, FormatTag::Jpg)
                .unwrap();
        let converter = fake(1);
        let mut run = ConversionRun::new(request);
        assert_eq!(run.status_text(), "");

        run.run(&converter, &mut |_| {}).unwrap();
        assert!(matches!(run.state(), ConversionState::Completed(_)));
        assert_eq!(run.status_text(), "Complete");

        let again = run.run(&converter, &mut |_| {});
        assert!(matches!(again, Err(WandlerError::AlreadyRun)));
    }

    #[test]
    fn failed_run_reports_message() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        let request =
            ConversionRequest::new(&missing, dir.path().join("a.pdf"), FormatTag::Png, FormatTag::Pdf)
                .unwrap();
        let mut run = ConversionRun::new(request);

        assert!(run.run(&fake(1), &mut |_| {}).is_err());
        assert!(matches!(run.state(), ConversionState::Failed(_)));
        assert!(run.status_text().starts_with("input file not found:"));
    }

    #[test]
    fn pdftoppm_chain_renders_every_page() {
        let poppler = PopplerRasterizer::default();
        if !poppler.is_available() {
            eprintln!("pdftoppm not on PATH; skipping");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let pages = vec![
            DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 50, Rgb([255, 0, 0]))),
            DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 50, Rgb([0, 0, 255]))),
        ];
        let pdf = dir.path().join("two.pdf");
        std::fs::write(&pdf, PdfWriter::new(100.0).create_from_images(&pages).unwrap()).unwrap();

        let export = dir.path().join("two.png");
        let request = ConversionRequest::new(&pdf, &export, FormatTag::Pdf, FormatTag::Png).unwrap();
        let done = Converter::new(ConverterConfig::default())
            .convert(&request)
            .unwrap();

        assert_eq!(done.outputs.len(), 2);
        for path in &done.outputs {
            assert!(image::open(path).is_ok());
        }
    }
}
