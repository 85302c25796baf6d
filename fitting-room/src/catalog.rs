use std::{
    collections::HashSet,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use bytes::Bytes;
use zip::ZipArchive;

use crate::{decode::ImageSource, geometry::Size};

/// Name of the catalog document, both on disk and inside bundles.
pub const CATALOG_MANIFEST: &str = "clothes.json";

mod json_model {
    use serde::Deserialize;

    use crate::geometry::Size;

    #[derive(Debug, Deserialize)]
    pub struct Root {
        #[serde(default)]
        pub clothes: Vec<Garment>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Garment {
        pub id: String,
        pub name: String,
        #[serde(default)]
        pub category: String,
        pub image: String,
        pub default_size: Size,
    }
}

/// A clothing item the user can put on the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Garment {
    pub id: String,
    pub name: String,
    pub category: String,
    /// The locator as written in the catalog.
    pub locator: String,
    pub image: ImageSource,
    pub default_size: Size,
}

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("Failed to parse catalog json: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("IO error")]
    IOError(#[from] std::io::Error),
    #[error("Invalid catalog bundle: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Invalid catalog bundle: no clothes.json found")]
    NoManifest,
    #[error("Garment with an empty id")]
    EmptyId,
    #[error("Duplicate garment id {0}")]
    DuplicateId(String),
    #[error("Garment {0} has a non-positive default size {w}x{h}", w = .1.width, h = .1.height)]
    InvalidSize(String, Size),
    #[error("No image {1} for garment {0} in bundle")]
    MissingImage(String, String, #[source] zip::result::ZipError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    garments: Vec<Garment>,
}

impl Catalog {
    /// Parse a catalog document. Relative image locators resolve against
    /// `base`.
    pub fn from_json(json: &str, base: Option<&Path>) -> Result<Self, CatalogError> {
        let root: json_model::Root = serde_json::from_str(json)?;
        Self::from_model(root, |garment| {
            Ok(ImageSource::locate(&garment.image, base))
        })
    }

    pub fn from_reader<R: Read>(reader: R, base: Option<&Path>) -> Result<Self, CatalogError> {
        let root: json_model::Root = serde_json::from_reader(reader)?;
        Self::from_model(root, |garment| {
            Ok(ImageSource::locate(&garment.image, base))
        })
    }

    /// Load a catalog file; images sit next to it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        Self::from_reader(reader, path.parent())
    }

    /// Load a bundle: a zip holding [`CATALOG_MANIFEST`] and the images it
    /// points to. Images are read into memory up front, remote locators are
    /// left as URLs.
    pub fn from_zip<T>(zip: &mut ZipArchive<T>) -> Result<Self, CatalogError>
    where
        T: std::io::Read + std::io::Seek,
    {
        let root: json_model::Root = {
            let mut manifest_entry = zip
                .by_name(CATALOG_MANIFEST)
                .map_err(|_err| CatalogError::NoManifest)?;
            serde_json::from_reader(&mut manifest_entry)?
        };

        Self::from_model(root, |garment| {
            let source = ImageSource::locate(&garment.image, None);
            if let ImageSource::Url(_) = source {
                return Ok(source);
            }
            let name = garment.image.trim_start_matches("./");
            let mut entry = zip.by_name(name).map_err(|err| {
                CatalogError::MissingImage(garment.id.clone(), garment.image.clone(), err)
            })?;

            let mut buf = Vec::new();
            entry.read_to_end(&mut buf)?;
            Ok(ImageSource::Bytes(Bytes::from(buf)))
        })
    }

    fn from_model(
        root: json_model::Root,
        mut resolve: impl FnMut(&json_model::Garment) -> Result<ImageSource, CatalogError>,
    ) -> Result<Self, CatalogError> {
        let garments = root
            .clothes
            .into_iter()
            .map(|garment| {
                let image = resolve(&garment)?;
                Ok(Garment {
                    id: garment.id,
                    name: garment.name,
                    category: garment.category,
                    locator: garment.image,
                    image,
                    default_size: garment.default_size,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        Self::from_garments(garments)
    }

    /// Build a catalog from records already in memory. Ids must be unique and
    /// non-empty, default sizes positive.
    pub fn from_garments(garments: Vec<Garment>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for garment in &garments {
            if garment.id.is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if !seen.insert(garment.id.as_str()) {
                return Err(CatalogError::DuplicateId(garment.id.clone()));
            }
            if !garment.default_size.is_positive() {
                return Err(CatalogError::InvalidSize(
                    garment.id.clone(),
                    garment.default_size,
                ));
            }
        }

        log::info!("Catalog loaded with {} garments", garments.len());
        Ok(Self { garments })
    }

    pub fn get(&self, id: &str) -> Option<&Garment> {
        self.garments.iter().find(|garment| garment.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Garment> {
        self.garments.iter()
    }

    pub fn len(&self) -> usize {
        self.garments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.garments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Cursor, Write},
        path::PathBuf,
    };

    use image::Rgba;
    use zip::{ZipWriter, write::SimpleFileOptions};

    use super::*;
    use crate::testing::png_bytes;

    const CLOTHES: &str = r#"{
        "clothes": [
            {
                "id": "shirt-1",
                "name": "Striped shirt",
                "category": "tops",
                "image": "images/shirt.png",
                "defaultSize": { "width": 150, "height": 200 }
            },
            {
                "id": "hat-1",
                "name": "Sun hat",
                "category": "accessories",
                "image": "https://cdn.example/hat.png",
                "defaultSize": { "width": 80, "height": 40 }
            }
        ]
    }"#;

    fn bundle(files: &[(&str, &[u8])]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in files {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents).unwrap();
        }
        let cursor = writer.finish().unwrap();
        ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap()
    }

    #[test]
    fn parse_catalog_from_json() {
        let catalog = Catalog::from_json(CLOTHES, Some(Path::new("/srv/wardrobe"))).unwrap();
        assert_eq!(catalog.len(), 2);

        let shirt = catalog.get("shirt-1").unwrap();
        assert_eq!(shirt.name, "Striped shirt");
        assert_eq!(shirt.category, "tops");
        assert_eq!(shirt.default_size, Size::new(150.0, 200.0));
        assert_eq!(
            shirt.image,
            ImageSource::Path(PathBuf::from("/srv/wardrobe/images/shirt.png"))
        );

        let hat = catalog.get("hat-1").unwrap();
        assert_eq!(
            hat.image,
            ImageSource::Url("https://cdn.example/hat.png".to_string())
        );
        assert!(catalog.get("socks").is_none());
    }

    #[test]
    fn empty_document_is_an_empty_catalog() {
        let catalog = Catalog::from_json("{}", None).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = r#"{"clothes": [
            {"id": "a", "name": "A", "category": "", "image": "a.png", "defaultSize": {"width": 1, "height": 1}},
            {"id": "a", "name": "B", "category": "", "image": "b.png", "defaultSize": {"width": 1, "height": 1}}
        ]}"#;
        let err = Catalog::from_json(json, None).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(id) if id == "a"));
    }

    #[test]
    fn rejects_non_positive_sizes() {
        let json = r#"{"clothes": [
            {"id": "a", "name": "A", "category": "", "image": "a.png", "defaultSize": {"width": 0, "height": 1}}
        ]}"#;
        let err = Catalog::from_json(json, None).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidSize(..)));
        assert_eq!(
            err.to_string(),
            "Garment a has a non-positive default size 0x1"
        );
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Catalog::from_json("{\"clothes\": [", None).unwrap_err();
        assert!(matches!(err, CatalogError::JsonParsing(_)));
    }

    #[test]
    fn loads_bundle_images_into_memory() {
        let shirt = png_bytes(3, 4, Rgba([255, 0, 0, 255]));
        let mut zip = bundle(&[
            (CATALOG_MANIFEST, CLOTHES.as_bytes()),
            ("images/shirt.png", shirt.as_slice()),
        ]);

        let catalog = Catalog::from_zip(&mut zip).unwrap();
        assert_eq!(
            catalog.get("shirt-1").unwrap().image,
            ImageSource::Bytes(Bytes::from(shirt))
        );
        assert!(matches!(
            catalog.get("hat-1").unwrap().image,
            ImageSource::Url(_)
        ));
    }

    #[test]
    fn bundle_without_manifest_or_image_fails() {
        let mut zip = bundle(&[("images/shirt.png", b"png".as_slice())]);
        assert!(matches!(
            Catalog::from_zip(&mut zip),
            Err(CatalogError::NoManifest)
        ));

        let mut zip = bundle(&[(CATALOG_MANIFEST, CLOTHES.as_bytes())]);
        let err = Catalog::from_zip(&mut zip).unwrap_err();
        assert!(matches!(err, CatalogError::MissingImage(id, ..) if id == "shirt-1"));
    }
}
