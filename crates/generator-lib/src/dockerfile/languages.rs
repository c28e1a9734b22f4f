//! Per-language build recipes

use crate::schema::dockerfile::{
    DockerfileRequest, JavaBuildTool, NodePackageManager, PhpFramework, PythonFramework,
    PythonPackageManager, RubyFramework,
};
use crate::schema::Language;

use super::images::Distro;

/// Inputs a recipe needs beyond the request itself
pub struct Context<'a> {
    pub request: &'a DockerfileRequest,
    pub version: &'a str,
    pub port: u32,
    pub multi_stage: bool,
    /// Distro of the stage that runs the build steps
    pub toolchain: Distro,
    /// Distro of the final stage
    pub runtime: Distro,
}

impl Context<'_> {
    fn workdir(&self) -> &str {
        self.request.workdir.trim_end_matches('/')
    }

    fn distroless(&self) -> bool {
        self.multi_stage && self.runtime == Distro::Distroless
    }
}

/// Language-specific Dockerfile content
#[derive(Debug, Default)]
pub struct Recipe {
    /// Instructions after WORKDIR in the build stage
    pub build: Vec<String>,
    /// `(source in builder, destination in runtime)` pairs
    pub artifacts: Vec<(String, String)>,
    /// Packages the final stage needs
    pub packages: Vec<&'static str>,
    /// Extra instructions for the final stage, before artifacts are copied
    pub runtime_setup: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Default start command in exec form
    pub command: Vec<String>,
}

fn run(cmd: impl AsRef<str>) -> String {
    format!("RUN {}", cmd.as_ref())
}

fn copy(src: impl AsRef<str>, dst: impl AsRef<str>) -> String {
    format!("COPY {} {}", src.as_ref(), dst.as_ref())
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

pub fn recipe(ctx: &Context<'_>) -> Recipe {
    match ctx.request.language {
        Language::Nodejs => nodejs(ctx),
        Language::Python => python(ctx),
        Language::Go => go(ctx),
        Language::Java => java(ctx),
        Language::Rust => rust(ctx),
        Language::Dotnet => dotnet(ctx),
        Language::Php => php(ctx),
        Language::Ruby => ruby(ctx),
    }
}

fn nodejs(ctx: &Context<'_>) -> Recipe {
    let cfg = ctx.request.nodejs_config.clone().unwrap_or_default();
    let (manifests, install, prune) = match cfg.package_manager {
        NodePackageManager::Npm => (
            "package.json package-lock.json*",
            "npm ci",
            "npm prune --omit=dev",
        ),
        NodePackageManager::Yarn => (
            "package.json yarn.lock",
            "yarn install --frozen-lockfile",
            "yarn install --production --frozen-lockfile --ignore-scripts --prefer-offline",
        ),
        NodePackageManager::Pnpm => (
            "package.json pnpm-lock.yaml",
            "corepack enable && pnpm install --frozen-lockfile",
            "pnpm prune --prod",
        ),
    };

    let mut build = vec![copy(manifests, "./"), run(install), copy(".", ".")];
    if let Some(cmd) = &cfg.build_command {
        build.push(run(cmd));
    }
    build.push(run(prune));

    let wd = ctx.workdir();
    let artifacts = match &cfg.build_output {
        Some(out) => vec![
            (format!("{}/node_modules", wd), "./node_modules".to_string()),
            (format!("{}/package.json", wd), "./package.json".to_string()),
            (format!("{}/{}", wd, out), format!("./{}", out)),
        ],
        None => vec![(wd.to_string(), ".".to_string())],
    };

    // distroless node images use `node` as the entrypoint
    let command = if ctx.distroless() {
        let entry = cfg
            .build_output
            .as_ref()
            .map(|out| format!("{}/index.js", out))
            .unwrap_or_else(|| "index.js".to_string());
        vec![entry]
    } else {
        argv(&["npm", "start"])
    };

    Recipe {
        build,
        artifacts,
        env: vec![("NODE_ENV".into(), "production".into())],
        command,
        ..Default::default()
    }
}

fn python(ctx: &Context<'_>) -> Recipe {
    let cfg = ctx.request.python_config.clone().unwrap_or_default();
    let requirements = cfg
        .requirements_file
        .clone()
        .unwrap_or_else(|| "requirements.txt".to_string());
    let target = if ctx.multi_stage { " --prefix=/install" } else { "" };
    let pip = format!("pip install --no-cache-dir{} -r requirements.txt", target);

    let mut build = Vec::new();
    match cfg.package_manager {
        PythonPackageManager::Pip => {
            build.push(copy(&requirements, "./requirements.txt"));
            build.push(run(&pip));
        }
        PythonPackageManager::Poetry => {
            build.push(copy("pyproject.toml poetry.lock*", "./"));
            build.push(run(format!(
                "pip install --no-cache-dir poetry poetry-plugin-export && poetry export -f requirements.txt --output requirements.txt --without-hashes && {}",
                pip
            )));
        }
        PythonPackageManager::Pipenv => {
            build.push(copy("Pipfile Pipfile.lock*", "./"));
            build.push(run(format!(
                "pip install --no-cache-dir pipenv && pipenv requirements > requirements.txt && {}",
                pip
            )));
        }
    }
    build.push(copy(".", "."));

    let mut env = vec![
        ("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string()),
        ("PYTHONUNBUFFERED".to_string(), "1".to_string()),
    ];
    if ctx.distroless() {
        let minor = ctx.version.split('.').take(2).collect::<Vec<_>>().join(".");
        env.push((
            "PYTHONPATH".to_string(),
            format!("/usr/local/lib/python{}/site-packages", minor),
        ));
    }

    let port = ctx.port.to_string();
    let bind = format!("0.0.0.0:{}", port);
    let module_name = ctx.request.project_name.replace('-', "_");
    let mut command = match cfg.framework {
        PythonFramework::Django => {
            let app = cfg
                .app_module
                .clone()
                .unwrap_or_else(|| format!("{}.wsgi:application", module_name));
            vec!["gunicorn".to_string(), "--bind".to_string(), bind, app]
        }
        PythonFramework::Flask => {
            let app = cfg.app_module.clone().unwrap_or_else(|| "app:app".to_string());
            vec!["gunicorn".to_string(), "--bind".to_string(), bind, app]
        }
        PythonFramework::Fastapi => {
            let app = cfg.app_module.clone().unwrap_or_else(|| "main:app".to_string());
            vec![
                "uvicorn".to_string(),
                app,
                "--host".to_string(),
                "0.0.0.0".to_string(),
                "--port".to_string(),
                port,
            ]
        }
        PythonFramework::None => argv(&["python", "main.py"]),
    };
    // distroless python images use `python3` as the entrypoint
    if ctx.distroless() {
        if command[0] == "python" {
            command.remove(0);
        } else {
            command.insert(0, "-m".to_string());
        }
    }

    let wd = ctx.workdir();
    Recipe {
        build,
        artifacts: vec![
            ("/install".to_string(), "/usr/local".to_string()),
            (wd.to_string(), ".".to_string()),
        ],
        env,
        command,
        ..Default::default()
    }
}

fn go(ctx: &Context<'_>) -> Recipe {
    let cfg = ctx.request.go_config.clone().unwrap_or_default();
    let binary = cfg
        .binary_name
        .clone()
        .unwrap_or_else(|| ctx.request.project_name.clone());
    let package = cfg.main_package.clone().unwrap_or_else(|| ".".to_string());
    let wd = ctx.workdir();

    let build = vec![
        copy("go.mod go.sum*", "./"),
        run("go mod download"),
        copy(".", "."),
        run(format!(
            "CGO_ENABLED={} GOOS=linux go build -ldflags=\"-s -w\" -o {}/{} {}",
            u8::from(cfg.cgo_enabled),
            wd,
            binary,
            package
        )),
    ];

    let packages = match ctx.runtime {
        Distro::Alpine => vec!["ca-certificates", "tzdata"],
        _ => vec!["ca-certificates"],
    };

    Recipe {
        build,
        artifacts: vec![(format!("{}/{}", wd, binary), format!("./{}", binary))],
        packages: if ctx.multi_stage { packages } else { Vec::new() },
        command: vec![format!("{}/{}", wd, binary)],
        ..Default::default()
    }
}

fn java(ctx: &Context<'_>) -> Recipe {
    let cfg = ctx.request.java_config.clone().unwrap_or_default();
    let (mut build, output_dir) = match cfg.build_tool {
        JavaBuildTool::Maven => (
            vec![
                copy("pom.xml", "./"),
                run("mvn -B -q dependency:go-offline"),
                copy("src", "./src"),
                run("mvn -B -q package -DskipTests"),
            ],
            "target",
        ),
        JavaBuildTool::Gradle => (
            vec![
                copy("build.gradle* settings.gradle*", "./"),
                run("gradle dependencies --no-daemon -q"),
                copy("src", "./src"),
                run("gradle build -x test --no-daemon"),
            ],
            "build/libs",
        ),
    };
    let jar = cfg.jar_name.clone().unwrap_or_else(|| "*.jar".to_string());
    let wd = ctx.workdir();

    let artifacts = if ctx.multi_stage {
        vec![(format!("{}/{}/{}", wd, output_dir, jar), "./app.jar".to_string())]
    } else {
        build.push(run(format!("cp {}/{} app.jar", output_dir, jar)));
        Vec::new()
    };

    let jar_path = format!("{}/app.jar", wd);
    // distroless java images use `java -jar` as the entrypoint
    let command = if ctx.distroless() {
        vec![jar_path]
    } else {
        vec!["java".to_string(), "-jar".to_string(), jar_path]
    };

    Recipe {
        build,
        artifacts,
        env: vec![(
            "JAVA_TOOL_OPTIONS".to_string(),
            cfg.jvm_options
                .clone()
                .unwrap_or_else(|| "-XX:MaxRAMPercentage=75.0".to_string()),
        )],
        command,
        ..Default::default()
    }
}

fn rust(ctx: &Context<'_>) -> Recipe {
    let cfg = ctx.request.rust_config.clone().unwrap_or_default();
    let binary = cfg
        .binary_name
        .clone()
        .unwrap_or_else(|| ctx.request.project_name.clone());
    let features = if cfg.features.is_empty() {
        String::new()
    } else {
        format!(" --features {}", cfg.features.join(","))
    };
    let wd = ctx.workdir();

    let mut build = Vec::new();
    if ctx.toolchain == Distro::Alpine {
        build.extend(ctx.toolchain.install(&["musl-dev"]));
    }
    build.push(copy("Cargo.toml Cargo.lock*", "./"));
    // cache dependencies in their own layer
    build.push(run(format!(
        "mkdir src && echo 'fn main() {{}}' > src/main.rs && cargo build --release{} && rm -rf src",
        features
    )));
    build.push(copy(".", "."));
    build.push(run(format!("touch src/main.rs && cargo build --release{}", features)));

    let built = format!("{}/target/release/{}", wd, binary);
    let command = if ctx.multi_stage {
        vec![format!("{}/{}", wd, binary)]
    } else {
        vec![built.clone()]
    };

    Recipe {
        build,
        artifacts: vec![(built, format!("./{}", binary))],
        packages: if ctx.multi_stage { vec!["ca-certificates"] } else { Vec::new() },
        command,
        ..Default::default()
    }
}

fn dotnet(ctx: &Context<'_>) -> Recipe {
    let cfg = ctx.request.dotnet_config.clone().unwrap_or_default();
    let wd = ctx.workdir();
    let (project_copy, project_arg) = match &cfg.project_file {
        Some(path) => {
            let dest = match path.rsplit_once('/') {
                Some((dir, _)) => format!("./{}/", dir),
                None => "./".to_string(),
            };
            (copy(path, dest), format!(" {}", path))
        }
        None => (copy("*.csproj", "./"), String::new()),
    };
    let assembly = cfg
        .assembly_name
        .clone()
        .unwrap_or_else(|| ctx.request.project_name.clone());

    let build = vec![
        project_copy,
        run(format!("dotnet restore{}", project_arg)),
        copy(".", "."),
        run(format!(
            "dotnet publish{} -c Release -o {}/publish --no-restore",
            project_arg, wd
        )),
    ];

    let mut env = vec![(
        "ASPNETCORE_URLS".to_string(),
        format!("http://+:{}", ctx.port),
    )];
    if ctx.multi_stage && ctx.runtime == Distro::Alpine {
        env.push(("DOTNET_SYSTEM_GLOBALIZATION_INVARIANT".to_string(), "true".to_string()));
    }

    let dll = if ctx.multi_stage {
        format!("{}/{}.dll", wd, assembly)
    } else {
        format!("{}/publish/{}.dll", wd, assembly)
    };

    Recipe {
        build,
        artifacts: vec![(format!("{}/publish", wd), ".".to_string())],
        env,
        command: vec!["dotnet".to_string(), dll],
        ..Default::default()
    }
}

fn php(ctx: &Context<'_>) -> Recipe {
    let cfg = ctx.request.php_config.clone().unwrap_or_default();
    let mut build = Vec::new();
    if !ctx.multi_stage {
        build.push(copy("--from=composer:2 /usr/bin/composer", "/usr/bin/composer"));
    }
    build.extend([
        copy("composer.json composer.lock*", "./"),
        run("composer install --no-dev --no-scripts --no-interaction --prefer-dist --optimize-autoloader"),
        copy(".", "."),
        run("composer dump-autoload --optimize --no-dev"),
    ]);

    let mut runtime_setup = Vec::new();
    if !cfg.extensions.is_empty() {
        runtime_setup.push(run(format!("docker-php-ext-install {}", cfg.extensions.join(" "))));
    }

    let port = ctx.port;
    let (env, command) = match cfg.framework {
        PhpFramework::Laravel => (
            vec![("APP_ENV".to_string(), "production".to_string())],
            vec![
                "php".to_string(),
                "artisan".to_string(),
                "serve".to_string(),
                "--host=0.0.0.0".to_string(),
                format!("--port={}", port),
            ],
        ),
        PhpFramework::Symfony => (
            vec![("APP_ENV".to_string(), "prod".to_string())],
            vec![
                "php".to_string(),
                "-S".to_string(),
                format!("0.0.0.0:{}", port),
                "-t".to_string(),
                "public".to_string(),
            ],
        ),
        PhpFramework::None => (
            Vec::new(),
            vec![
                "php".to_string(),
                "-S".to_string(),
                format!("0.0.0.0:{}", port),
                "index.php".to_string(),
            ],
        ),
    };

    Recipe {
        build,
        artifacts: vec![(ctx.workdir().to_string(), ".".to_string())],
        // composer needs these to unpack dist archives in a single stage
        packages: if ctx.multi_stage { Vec::new() } else { vec!["git", "unzip"] },
        runtime_setup,
        env,
        command,
    }
}

fn ruby(ctx: &Context<'_>) -> Recipe {
    let cfg = ctx.request.ruby_config.clone().unwrap_or_default();
    let compiler = match ctx.toolchain {
        Distro::Alpine => "build-base",
        _ => "build-essential",
    };

    let mut build = Vec::new();
    build.extend(ctx.toolchain.install(&[compiler]));
    build.extend([
        copy("Gemfile Gemfile.lock*", "./"),
        run("bundle config set --local without 'development test' && bundle install --jobs 4 --retry 3"),
        copy(".", "."),
    ]);
    if cfg.framework == RubyFramework::Rails {
        build.push(run("SECRET_KEY_BASE_DUMMY=1 bundle exec rails assets:precompile"));
    }

    let port = ctx.port.to_string();
    let (env, command) = match cfg.framework {
        RubyFramework::Rails => (
            vec![
                ("RAILS_ENV".to_string(), "production".to_string()),
                ("RAILS_LOG_TO_STDOUT".to_string(), "true".to_string()),
            ],
            vec![
                "bundle".to_string(),
                "exec".to_string(),
                "rails".to_string(),
                "server".to_string(),
                "-b".to_string(),
                "0.0.0.0".to_string(),
                "-p".to_string(),
                port,
            ],
        ),
        RubyFramework::Sinatra => (
            vec![("RACK_ENV".to_string(), "production".to_string())],
            vec![
                "bundle".to_string(),
                "exec".to_string(),
                "rackup".to_string(),
                "--host".to_string(),
                "0.0.0.0".to_string(),
                "--port".to_string(),
                port,
            ],
        ),
        RubyFramework::None => (Vec::new(), argv(&["ruby", "app.rb"])),
    };

    Recipe {
        build,
        artifacts: vec![
            ("/usr/local/bundle".to_string(), "/usr/local/bundle".to_string()),
            (ctx.workdir().to_string(), ".".to_string()),
        ],
        env,
        command,
        ..Default::default()
    }
}
