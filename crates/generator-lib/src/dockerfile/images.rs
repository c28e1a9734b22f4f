//! Base image selection
//!
//! Maps (language, base image family, version) to the toolchain image used
//! for building and the runtime image the final stage starts from.

use crate::schema::dockerfile::{BaseImageType, DockerfileRequest, JavaBuildTool};
use crate::schema::Language;

/// Userland of an image, which decides package manager and user tooling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distro {
    Alpine,
    Debian,
    /// No shell, no package manager
    Distroless,
}

impl Distro {
    /// Package install instruction, `None` when nothing can be installed
    pub fn install(&self, packages: &[&str]) -> Option<String> {
        if packages.is_empty() {
            return None;
        }
        let list = packages.join(" ");
        match self {
            Distro::Alpine => Some(format!("RUN apk add --no-cache {}", list)),
            Distro::Debian => Some(format!(
                "RUN apt-get update && apt-get install -y --no-install-recommends {} && rm -rf /var/lib/apt/lists/*",
                list
            )),
            Distro::Distroless => None,
        }
    }

    /// User and group creation for a non-root account
    pub fn create_user(&self, user: &str, uid: u32) -> Option<String> {
        match self {
            Distro::Alpine => Some(format!(
                "RUN addgroup -g {uid} -S {user} && adduser -u {uid} -S -G {user} {user}",
                uid = uid,
                user = user
            )),
            Distro::Debian => Some(format!(
                "RUN groupadd --system --gid {uid} {user} && useradd --system --uid {uid} --gid {user} --create-home --shell /usr/sbin/nologin {user}",
                uid = uid,
                user = user
            )),
            Distro::Distroless => None,
        }
    }
}

/// Non-root uid shipped by distroless images
pub const DISTROLESS_NONROOT: &str = "65532:65532";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub reference: String,
    pub distro: Distro,
}

impl Image {
    fn new(reference: impl Into<String>, distro: Distro) -> Self {
        Self {
            reference: reference.into(),
            distro,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StageImages {
    /// Image carrying the build toolchain
    pub toolchain: Image,
    /// Image the multi-stage runtime stage starts from
    pub runtime: Image,
    /// Image used when multi-stage builds are disabled
    pub single: Image,
}

/// Pinned runtime version used when the request names none
pub fn default_version(language: Language) -> &'static str {
    match language {
        Language::Nodejs => "20",
        Language::Python => "3.12",
        Language::Go => "1.22",
        Language::Java => "17",
        Language::Rust => "1.77",
        Language::Dotnet => "8.0",
        Language::Php => "8.3",
        Language::Ruby => "3.3",
    }
}

/// Port the language's conventional server listens on
pub fn default_port(language: Language) -> u32 {
    match language {
        Language::Nodejs | Language::Ruby => 3000,
        Language::Python | Language::Php => 8000,
        Language::Go | Language::Java | Language::Rust | Language::Dotnet => 8080,
    }
}

/// Whether a distroless runtime exists for the language
pub fn has_distroless(language: Language) -> bool {
    !matches!(language, Language::Php | Language::Ruby)
}

/// `<version>-<variant>`, collapsing `latest`
fn tag(version: &str, variant: &str) -> String {
    match (version, variant) {
        ("latest", "") => "latest".to_string(),
        ("latest", v) => v.to_string(),
        (ver, "") => ver.to_string(),
        (ver, v) => format!("{}-{}", ver, v),
    }
}

fn family(base: BaseImageType) -> Distro {
    match base {
        BaseImageType::Alpine => Distro::Alpine,
        _ => Distro::Debian,
    }
}

/// Official language image, with distroless falling back to slim
fn official(repo: &str, version: &str, base: BaseImageType) -> Image {
    let variant = match base {
        BaseImageType::Alpine => "alpine",
        BaseImageType::Slim | BaseImageType::Distroless => "slim",
        BaseImageType::Debian => "bookworm",
        BaseImageType::Ubuntu => "",
    };
    Image::new(format!("{}:{}", repo, tag(version, variant)), family(base))
}

/// Plain OS image for statically linked binaries
fn os_image(base: BaseImageType, distroless: &str) -> Image {
    match base {
        BaseImageType::Alpine => Image::new("alpine:3.19", Distro::Alpine),
        BaseImageType::Slim => Image::new("debian:bookworm-slim", Distro::Debian),
        BaseImageType::Debian => Image::new("debian:bookworm", Distro::Debian),
        BaseImageType::Ubuntu => Image::new("ubuntu:22.04", Distro::Debian),
        BaseImageType::Distroless => Image::new(distroless, Distro::Distroless),
    }
}

fn major(version: &str, language: Language) -> String {
    let version = if version == "latest" {
        default_version(language)
    } else {
        version
    };
    version.split('.').next().unwrap_or(version).to_string()
}

pub fn select(request: &DockerfileRequest, version: &str) -> StageImages {
    let base = request.base_image_type;
    let (toolchain, runtime) = match request.language {
        Language::Nodejs => {
            let toolchain = official("node", version, base);
            let runtime = match base {
                BaseImageType::Distroless => Image::new(
                    format!("gcr.io/distroless/nodejs{}-debian12", major(version, Language::Nodejs)),
                    Distro::Distroless,
                ),
                _ => toolchain.clone(),
            };
            (toolchain, runtime)
        }
        Language::Python => {
            let toolchain = official("python", version, base);
            let runtime = match base {
                BaseImageType::Distroless => {
                    Image::new("gcr.io/distroless/python3-debian12", Distro::Distroless)
                }
                _ => toolchain.clone(),
            };
            (toolchain, runtime)
        }
        Language::Go => {
            let variant = match base {
                BaseImageType::Alpine => "alpine",
                BaseImageType::Ubuntu => "",
                _ => "bookworm",
            };
            let cgo = request.go_config.as_ref().is_some_and(|c| c.cgo_enabled);
            let distroless = if cgo {
                "gcr.io/distroless/base-debian12"
            } else {
                "gcr.io/distroless/static-debian12"
            };
            (
                Image::new(format!("golang:{}", tag(version, variant)), family(base)),
                os_image(base, distroless),
            )
        }
        Language::Rust => {
            let variant = match base {
                BaseImageType::Alpine => "alpine",
                BaseImageType::Slim | BaseImageType::Distroless => "slim-bookworm",
                BaseImageType::Debian => "bookworm",
                BaseImageType::Ubuntu => "",
            };
            (
                Image::new(format!("rust:{}", tag(version, variant)), family(base)),
                os_image(base, "gcr.io/distroless/cc-debian12"),
            )
        }
        Language::Java => {
            let gradle = request
                .java_config
                .as_ref()
                .is_some_and(|c| c.build_tool == JavaBuildTool::Gradle);
            let alpine = if base == BaseImageType::Alpine { "-alpine" } else { "" };
            let toolchain = match (gradle, version) {
                (false, "latest") => "maven:latest".to_string(),
                (true, "latest") => "gradle:latest".to_string(),
                (false, v) => format!("maven:3.9-eclipse-temurin-{}{}", v, alpine),
                (true, v) => format!("gradle:8-jdk{}{}", v, alpine),
            };
            let runtime = match base {
                BaseImageType::Alpine => {
                    Image::new(format!("eclipse-temurin:{}", tag(version, "jre-alpine")), Distro::Alpine)
                }
                BaseImageType::Slim | BaseImageType::Debian => {
                    Image::new(format!("eclipse-temurin:{}", tag(version, "jre")), Distro::Debian)
                }
                BaseImageType::Ubuntu => {
                    Image::new(format!("eclipse-temurin:{}", tag(version, "jre-jammy")), Distro::Debian)
                }
                BaseImageType::Distroless => Image::new(
                    format!("gcr.io/distroless/java{}-debian12", major(version, Language::Java)),
                    Distro::Distroless,
                ),
            };
            (Image::new(toolchain, family(base)), runtime)
        }
        Language::Dotnet => {
            let sdk_variant = if base == BaseImageType::Alpine { "alpine" } else { "" };
            let (variant, distro) = match base {
                BaseImageType::Alpine => ("alpine", Distro::Alpine),
                BaseImageType::Slim => ("bookworm-slim", Distro::Debian),
                BaseImageType::Debian => ("", Distro::Debian),
                BaseImageType::Ubuntu => ("jammy", Distro::Debian),
                BaseImageType::Distroless => ("jammy-chiseled", Distro::Distroless),
            };
            (
                Image::new(
                    format!("mcr.microsoft.com/dotnet/sdk:{}", tag(version, sdk_variant)),
                    family(base),
                ),
                Image::new(format!("mcr.microsoft.com/dotnet/aspnet:{}", tag(version, variant)), distro),
            )
        }
        Language::Php => {
            let runtime = match base {
                BaseImageType::Alpine => {
                    Image::new(format!("php:{}", tag(version, "cli-alpine")), Distro::Alpine)
                }
                _ => Image::new(format!("php:{}", tag(version, "cli")), Distro::Debian),
            };
            (Image::new("composer:2", Distro::Alpine), runtime)
        }
        Language::Ruby => {
            let toolchain = official("ruby", version, base);
            (toolchain.clone(), toolchain)
        }
    };

    // PHP builds in the runtime image with composer copied in; everything
    // else builds and runs in the toolchain image.
    let single = match request.language {
        Language::Php => runtime.clone(),
        _ => toolchain.clone(),
    };

    StageImages {
        toolchain,
        runtime,
        single,
    }
}
