// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    Error, Label, ProjectID, TaskID,
    api::{
        LabelWrite, LoginResult, Project, ProjectCreate, ProjectLabelsPatch, RequestHandle,
        RequestStatus, ServerAbout, StorageLocation, Task, TaskCreate,
    },
    poll::{PollPolicy, poll_until},
    service::{AnnotationService, ImageFile},
};
use futures::{TryStreamExt as _, stream};
use log::{Level, debug, error, log_enabled, trace};
use reqwest::{
    Body, RequestBuilder, Response, StatusCode,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use std::{collections::HashMap, path::Path, time::Duration};
use tokio::fs::File;
use tokio_util::codec::{BytesCodec, FramedRead};
use url::Url;

const USER_AGENT: &str = "cvat-ingest";

fn timeout_secs() -> u64 {
    std::env::var("CVAT_TIMEOUT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(600) // Whole-segment uploads can be large
}

/// Client for the CVAT REST API.
///
/// The client holds one pooled HTTP connection manager and, once logged in,
/// the session token sent with every request. It is cheap to clone.
///
/// # Examples
///
/// ```no_run
/// use cvat_ingest::Client;
///
/// # async fn example() -> Result<(), cvat_ingest::Error> {
/// let client = Client::new("http://localhost:8080")?
///     .with_login("annotator", "secret")
///     .await?;
/// println!("Connected to {}", client.url());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    url: Url,
    token: Option<String>,
    import_poll: PollPolicy,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.url.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl Client {
    /// Create a new unauthenticated client for the server at `server`
    /// (for example `http://10.0.0.5:8080`).
    pub fn new(server: &str) -> Result<Self, Error> {
        let mut url = Url::parse(server)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let timeout = timeout_secs();
        debug!("Client configuration - server={}, timeout={}s", url, timeout);

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(timeout))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Client {
            http,
            url,
            token: None,
            import_poll: PollPolicy::default(),
        })
    }

    /// Returns a new client authenticated with the provided username and
    /// password.
    ///
    /// Fails with [`Error::AuthenticationFailed`] when the server rejects the
    /// credentials or does not return a session key.
    pub async fn with_login(&self, username: &str, password: &str) -> Result<Self, Error> {
        let params = HashMap::from([("username", username), ("password", password)]);
        let res = self
            .http
            .post(self.endpoint("api/auth/login")?)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .json(&params)
            .send()
            .await?;

        let status = res.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            let message = res.text().await.unwrap_or_default();
            return Err(Error::AuthenticationFailed(format!("{}: {}", status, message)));
        }

        let login: LoginResult = Self::process_json_response(res).await?;
        let token = match login.key {
            Some(key) if !key.is_empty() => key,
            _ => {
                return Err(Error::AuthenticationFailed(
                    "server did not return a session key".to_owned(),
                ));
            }
        };

        debug!("Logged into {} as {}", self.url, username);

        Ok(Client {
            token: Some(token),
            ..self.clone()
        })
    }

    /// Returns a new client that tracks queued annotation imports with the
    /// provided poll policy.
    pub fn with_import_poll(&self, policy: PollPolicy) -> Self {
        Client {
            import_poll: policy,
            ..self.clone()
        }
    }

    /// Base URL of the server, with a trailing slash.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Session token, if the client is authenticated.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Return the version of the CVAT server.
    pub async fn server_version(&self) -> Result<ServerAbout, Error> {
        let req = self.http.get(self.endpoint("api/server/about")?);
        self.send_json(req).await
    }

    /// Retrieve task metadata.
    pub async fn task(&self, task_id: TaskID) -> Result<Task, Error> {
        let req = self
            .http
            .get(self.endpoint(&format!("api/tasks/{}", task_id))?);
        self.send_json(req).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.url.join(path)?)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT);
        match &self.token {
            Some(token) => req.header("Authorization", format!("Token {}", token)),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, Error> {
        let res = self.authorized(req).send().await?;
        Self::check_status(res).await
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, Error> {
        let res = self.authorized(req).send().await?;
        Self::process_json_response(res).await
    }

    /// Turn a non-2xx response into [`Error::ServiceError`] carrying the
    /// status and the response body.
    async fn check_status(res: Response) -> Result<Response, Error> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let message = res.text().await.unwrap_or_default();
        debug!("Service error {}: {}", status, message);
        Err(Error::ServiceError {
            status: status.as_u16(),
            message,
        })
    }

    async fn process_json_response<T: DeserializeOwned>(res: Response) -> Result<T, Error> {
        let res = Self::check_status(res).await?;
        let body = res.bytes().await?;

        if log_enabled!(Level::Trace) {
            trace!("Response: {}", String::from_utf8_lossy(&body));
        }

        match serde_json::from_slice(&body) {
            Ok(value) => Ok(value),
            Err(err) => {
                error!("Invalid JSON Response: {}", String::from_utf8_lossy(&body));
                Err(err.into())
            }
        }
    }

    /// Multipart file part streamed from `path`.
    ///
    /// The file is only opened once the request body reaches this part and is
    /// closed at its end, so a form with thousands of images holds a single
    /// descriptor at a time.
    fn file_part(path: &Path, name: &str, mime: &str) -> Result<Part, Error> {
        let length = std::fs::metadata(path)?.len();
        let stream = stream::once(File::open(path.to_path_buf()))
            .map_ok(|file| FramedRead::new(file, BytesCodec::new()))
            .try_flatten();
        let body = Body::wrap_stream(stream);
        Ok(Part::stream_with_length(body, length)
            .file_name(name.to_owned())
            .mime_str(mime)?)
    }

    async fn wait_for_request(&self, rq_id: &str) -> Result<(), Error> {
        let url = self.endpoint(&format!("api/requests/{}", rq_id))?;

        poll_until(&self.import_poll, move || {
            let req = self.http.get(url.clone());
            async move {
                let status: RequestStatus = self.send_json(req).await?;
                match status.status.as_str() {
                    "finished" => Ok(Some(())),
                    "failed" => Err(Error::ImportFailed(
                        status.message.unwrap_or_else(|| "no message".to_owned()),
                    )),
                    other => {
                        trace!("Request {} is {}", rq_id, other);
                        Ok(None)
                    }
                }
            }
        })
        .await?;

        Ok(())
    }
}

impl AnnotationService for Client {
    async fn create_project(&self, name: &str) -> Result<ProjectID, Error> {
        let req = self
            .http
            .post(self.endpoint("api/projects")?)
            .json(&ProjectCreate { name });
        let project: Project = self.send_json(req).await?;
        debug!("Created project {}", project);
        Ok(project.id())
    }

    async fn set_project_labels(&self, project: ProjectID, labels: &[Label]) -> Result<(), Error> {
        let patch = ProjectLabelsPatch {
            labels: labels.iter().map(LabelWrite::from).collect(),
        };
        let req = self
            .http
            .patch(self.endpoint(&format!("api/projects/{}", project))?)
            .json(&patch);
        let _: Project = self.send_json(req).await?;
        Ok(())
    }

    async fn create_task(
        &self,
        project: ProjectID,
        name: &str,
        assignee: Option<u64>,
    ) -> Result<TaskID, Error> {
        let create = TaskCreate {
            name,
            project_id: project,
            assignee_id: assignee,
            source_storage: StorageLocation { location: "local" },
        };
        let req = self
            .http
            .post(self.endpoint("api/tasks")?)
            .json(&create);
        let task: Task = self.send_json(req).await?;
        debug!("Created task {}", task);
        Ok(task.id())
    }

    async fn upload_images(&self, task: TaskID, images: &[ImageFile]) -> Result<(), Error> {
        let mut form = Form::new()
            .text("image_quality", "100")
            .text("compressed_chunk_type", "imageset");

        for (index, image) in images.iter().enumerate() {
            let mime = infer::get_from_path(image.path())?
                .map(|kind| kind.mime_type())
                .unwrap_or("application/octet-stream");
            let part = Self::file_part(image.path(), image.name(), mime)?;
            form = form.part(format!("client_files[{}]", index), part);
        }

        let req = self
            .http
            .post(self.endpoint(&format!("api/tasks/{}/data", task))?)
            .header("Upload-Start", "true")
            .header("Upload-Multiple", "true")
            .header("Upload-Finish", "true")
            .multipart(form);
        let res = self.send(req).await?;

        if log_enabled!(Level::Trace) {
            let body = res.bytes().await?;
            trace!("Upload Response: {}", String::from_utf8_lossy(&body));
        }

        Ok(())
    }

    async fn uploaded_count(&self, task: TaskID) -> Result<Option<u64>, Error> {
        Ok(self.task(task).await?.size())
    }

    async fn import_annotations(
        &self,
        task: TaskID,
        path: &Path,
        format: &str,
    ) -> Result<(), Error> {
        let mut url = self.endpoint(&format!("api/tasks/{}/annotations", task))?;
        url.query_pairs_mut().append_pair("format", format);

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("annotations.json");
        let form = Form::new().part(
            "annotation_file",
            Self::file_part(path, name, "application/json")?,
        );

        let res = self.send(self.http.post(url).multipart(form)).await?;
        if res.status() != StatusCode::ACCEPTED {
            return Ok(());
        }

        let body = res.bytes().await?;
        if log_enabled!(Level::Trace) {
            trace!("Import Response: {}", String::from_utf8_lossy(&body));
        }
        let handle: RequestHandle = serde_json::from_slice(&body).map_err(|err| {
            error!("Import accepted without a request id: {}", err);
            Error::InvalidResponse
        })?;
        debug!("Annotation import for task {} queued as {}", task, handle.rq_id);

        self.wait_for_request(&handle.rq_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LabelType;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        task::JoinHandle,
    };

    /// A request received by the scripted server.
    #[derive(Debug)]
    struct Recorded {
        method: String,
        target: String,
        headers: HashMap<String, String>,
        body: Vec<u8>,
    }

    impl Recorded {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(name).map(String::as_str)
        }

        fn text(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }

        fn json(&self) -> Value {
            serde_json::from_slice(&self.body).unwrap()
        }
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    }

    fn dechunk(mut raw: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        loop {
            let end = find(raw, b"\r\n").unwrap();
            let line = String::from_utf8_lossy(&raw[..end]).into_owned();
            let size = usize::from_str_radix(line.split(';').next().unwrap().trim(), 16).unwrap();
            raw = &raw[end + 2..];
            if size == 0 {
                return body;
            }
            body.extend_from_slice(&raw[..size]);
            raw = &raw[size + 2..];
        }
    }

    async fn read_request(stream: &mut TcpStream) -> Recorded {
        let mut buf = Vec::new();
        let mut chunk = vec![0u8; 64 * 1024];

        let head_len = loop {
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed inside the request head");
            buf.extend_from_slice(&chunk[..n]);
        };

        let head = String::from_utf8_lossy(&buf[..head_len]).into_owned();
        let mut lines = head.split("\r\n");
        let mut request_line = lines.next().unwrap().split(' ');
        let method = request_line.next().unwrap().to_owned();
        let target = request_line.next().unwrap().to_owned();
        let headers: HashMap<String, String> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_owned()))
            .collect();

        let mut body = buf[head_len..].to_vec();
        if let Some(length) = headers.get("content-length") {
            let length: usize = length.parse().unwrap();
            while body.len() < length {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed inside the request body");
                body.extend_from_slice(&chunk[..n]);
            }
        } else if headers
            .get("transfer-encoding")
            .is_some_and(|te| te.eq_ignore_ascii_case("chunked"))
        {
            while !body.ends_with(b"0\r\n\r\n") {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed inside the request body");
                body.extend_from_slice(&chunk[..n]);
            }
            body = dechunk(&body);
        }

        Recorded {
            method,
            target,
            headers,
            body,
        }
    }

    /// Start a server answering one connection per scripted `(status, body)`
    /// reply, in order, and return a client pointed at it together with the
    /// handle yielding the recorded requests.
    async fn serve(replies: Vec<(u16, &'static str)>) -> (Client, JoinHandle<Vec<Recorded>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let mut requests = Vec::with_capacity(replies.len());
            for (status, body) in replies {
                let (mut stream, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut stream).await);
                let reply = format!(
                    "HTTP/1.1 {} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(reply.as_bytes()).await.unwrap();
                let _ = stream.shutdown().await;
            }
            requests
        });

        // Loopback traffic must not be routed through an environment proxy.
        let client = Client {
            http: reqwest::Client::builder().no_proxy().build().unwrap(),
            ..Client::new(&url).unwrap()
        };
        (client, server)
    }

    async fn logged_in(
        mut replies: Vec<(u16, &'static str)>,
    ) -> (Client, JoinHandle<Vec<Recorded>>) {
        replies.insert(0, (200, r#"{"key": "abc123"}"#));
        let (client, server) = serve(replies).await;
        let client = client.with_login("annotator", "secret").await.unwrap();
        (client, server)
    }

    #[test]
    fn test_new_normalizes_base_url() {
        let client = Client::new("http://localhost:8080").unwrap();
        assert_eq!(client.url(), "http://localhost:8080/");
        assert_eq!(
            client.endpoint("api/tasks/3").unwrap().as_str(),
            "http://localhost:8080/api/tasks/3"
        );

        let client = Client::new("https://example.com/cvat").unwrap();
        assert_eq!(
            client.endpoint("api/projects").unwrap().as_str(),
            "https://example.com/cvat/api/projects"
        );
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        assert!(matches!(
            Client::new("not a url"),
            Err(Error::UrlParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let client = Client::new("http://127.0.0.1:9").unwrap();
        let result = client.uploaded_count(TaskID::from(1)).await;
        assert!(matches!(result, Err(Error::HttpError(_))));
    }

    #[tokio::test]
    async fn test_login_token_is_sent_with_requests() {
        let (client, server) = logged_in(vec![(200, r#"{"id": 7, "name": "seg", "size": 3}"#)]).await;
        assert_eq!(client.token(), Some("abc123"));

        let debug = format!("{:?}", client);
        assert!(!debug.contains("abc123"));
        assert!(debug.contains("authenticated: true"));

        assert_eq!(client.uploaded_count(TaskID::from(7)).await.unwrap(), Some(3));

        let requests = server.await.unwrap();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/api/auth/login");
        assert_eq!(
            requests[0].json(),
            json!({"username": "annotator", "password": "secret"})
        );
        assert!(requests[0].header("authorization").is_none());

        assert_eq!(requests[1].method, "GET");
        assert_eq!(requests[1].target, "/api/tasks/7");
        assert_eq!(requests[1].header("authorization"), Some("Token abc123"));
        assert_eq!(requests[1].header("user-agent"), Some(USER_AGENT));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        for status in [400, 401, 403] {
            let (client, server) = serve(vec![(status, r#"{"detail": "bad credentials"}"#)]).await;
            let result = client.with_login("annotator", "wrong").await;
            assert!(
                matches!(&result, Err(Error::AuthenticationFailed(msg)) if msg.contains("bad credentials")),
                "status {}: {:?}",
                status,
                result
            );
            server.await.unwrap();
        }

        for body in [r#"{"key": ""}"#, "{}"] {
            let (client, server) = serve(vec![(200, body)]).await;
            let result = client.with_login("annotator", "secret").await;
            assert!(matches!(result, Err(Error::AuthenticationFailed(_))), "{}", body);
            server.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_uploaded_count_without_size() {
        let (client, server) = serve(vec![
            (200, r#"{"id": 7, "name": "seg"}"#),
            (200, r#"{"id": 7, "name": "seg", "size": null}"#),
            (200, r#"{"id": 7, "name": "seg", "size": 0}"#),
        ])
        .await;

        let task = TaskID::from(7);
        assert_eq!(client.uploaded_count(task).await.unwrap(), None);
        assert_eq!(client.uploaded_count(task).await.unwrap(), None);
        assert_eq!(client.uploaded_count(task).await.unwrap(), Some(0));
        assert_eq!(server.await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_service_error_carries_status_and_body() {
        let (client, server) = logged_in(vec![(500, r#"{"detail": "boom"}"#)]).await;

        match client.create_project("vehicles").await {
            Err(Error::ServiceError { status, message }) => {
                assert_eq!(status, 500);
                assert!(message.contains("boom"));
            }
            other => panic!("expected ServiceError, got {:?}", other),
        }

        let requests = server.await.unwrap();
        assert_eq!(requests[1].target, "/api/projects");
        assert_eq!(requests[1].json(), json!({"name": "vehicles"}));
    }

    #[tokio::test]
    async fn test_project_and_task_requests() {
        let (client, server) = logged_in(vec![
            (201, r#"{"id": 3, "name": "vehicles"}"#),
            (200, r#"{"id": 3, "name": "vehicles"}"#),
            (201, r#"{"id": 11, "name": "vehicles_0000", "project_id": 3}"#),
            (201, r#"{"id": 12, "name": "vehicles_0001", "project_id": 3}"#),
        ])
        .await;

        let project = client.create_project("vehicles").await.unwrap();
        assert_eq!(project, ProjectID::from(3));
        let labels = [
            Label::new("car", "#2080c0", LabelType::Rectangle),
            Label::new("lane", "#ffffff", LabelType::Polyline),
        ];
        client.set_project_labels(project, &labels).await.unwrap();
        let first = client.create_task(project, "vehicles_0000", Some(5)).await.unwrap();
        let second = client.create_task(project, "vehicles_0001", None).await.unwrap();
        assert_eq!(first, TaskID::from(11));
        assert_eq!(second, TaskID::from(12));

        let requests = server.await.unwrap();
        assert_eq!(requests[2].method, "PATCH");
        assert_eq!(requests[2].target, "/api/projects/3");
        assert_eq!(
            requests[2].json(),
            json!({"labels": [
                {"name": "car", "color": "#2080c0", "type": "rectangle",
                 "attributes": [], "multi_shapes": false},
                {"name": "lane", "color": "#ffffff", "type": "polyline",
                 "attributes": [], "multi_shapes": false}
            ]})
        );

        assert_eq!(requests[3].target, "/api/tasks");
        assert_eq!(
            requests[3].json(),
            json!({"name": "vehicles_0000", "project_id": 3, "assignee_id": 5,
                   "source_storage": {"location": "local"}})
        );
        assert!(requests[4].json().get("assignee_id").is_none());
    }

    #[tokio::test]
    async fn test_upload_images_form() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("a.png");
        let jpg = dir.path().join("b.jpg");
        std::fs::write(&png, b"\x89PNG\r\n\x1a\n png-pixels").unwrap();
        std::fs::write(&jpg, b"\xff\xd8\xff\xe0 jpeg-pixels").unwrap();

        let (client, server) = logged_in(vec![(202, r#"{"rq_id": "upload"}"#)]).await;
        let images = [ImageFile::new("a.png", png), ImageFile::new("b.jpg", jpg)];
        client
            .upload_images(TaskID::from(7), &images)
            .await
            .unwrap();

        let requests = server.await.unwrap();
        let upload = &requests[1];
        assert_eq!(upload.method, "POST");
        assert_eq!(upload.target, "/api/tasks/7/data");
        assert_eq!(upload.header("authorization"), Some("Token abc123"));
        assert_eq!(upload.header("upload-start"), Some("true"));
        assert_eq!(upload.header("upload-multiple"), Some("true"));
        assert_eq!(upload.header("upload-finish"), Some("true"));
        assert!(
            upload
                .header("content-type")
                .is_some_and(|ct| ct.starts_with("multipart/form-data; boundary="))
        );

        let body = upload.text();
        assert!(body.contains("name=\"image_quality\"\r\n\r\n100\r\n"));
        assert!(body.contains("name=\"compressed_chunk_type\"\r\n\r\nimageset\r\n"));
        assert!(body.contains("name=\"client_files[0]\""));
        assert!(body.contains("name=\"client_files[1]\""));
        assert!(body.contains("Content-Type: image/png"));
        assert!(body.contains("Content-Type: image/jpeg"));

        let first = body.find("filename=\"a.png\"").unwrap();
        let second = body.find("filename=\"b.jpg\"").unwrap();
        assert!(first < second);
        assert!(body[first..second].contains("png-pixels"));
        assert!(body[second..].contains("jpeg-pixels"));
    }

    #[tokio::test]
    async fn test_upload_missing_image_fails_before_sending() {
        let dir = TempDir::new().unwrap();
        let (client, server) = serve(vec![]).await;
        let images = [ImageFile::new("gone.png", dir.path().join("gone.png"))];

        let result = client.upload_images(TaskID::from(7), &images).await;
        assert!(matches!(result, Err(Error::IoError(_))));
        assert!(server.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_segment_larger_than_descriptor_limit() {
        // More files than the usual 1024 descriptor soft limit: the form must
        // not hold every image open at once.
        let dir = TempDir::new().unwrap();
        let images: Vec<ImageFile> = (0..1100)
            .map(|i| {
                let name = format!("frame_{:05}.png", i);
                let path = dir.path().join(&name);
                std::fs::write(&path, format!("pixels-{:05}", i)).unwrap();
                ImageFile::new(&name, path)
            })
            .collect();

        let (client, server) = serve(vec![(202, "{}")]).await;
        client
            .upload_images(TaskID::from(9), &images)
            .await
            .unwrap();

        let requests = server.await.unwrap();
        let body = requests[0].text();
        assert!(body.contains("name=\"client_files[1099]\""));
        assert!(body.contains("pixels-00000"));
        assert!(body.contains("pixels-01099"));
    }

    fn annotation_file(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("gt_0000.json");
        std::fs::write(&path, r#"{"images": [], "annotations": []}"#).unwrap();
        path
    }

    #[tokio::test]
    async fn test_import_created_is_done() {
        let dir = TempDir::new().unwrap();
        let path = annotation_file(&dir);
        let (client, server) = logged_in(vec![(201, "")]).await;

        client
            .import_annotations(TaskID::from(7), &path, "COCO 1.0")
            .await
            .unwrap();

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        let import = &requests[1];
        assert_eq!(import.method, "POST");
        assert_eq!(import.target, "/api/tasks/7/annotations?format=COCO+1.0");
        let body = import.text();
        assert!(body.contains("name=\"annotation_file\""));
        assert!(body.contains("filename=\"gt_0000.json\""));
        assert!(body.contains("Content-Type: application/json"));
        assert!(body.contains(r#"{"images": [], "annotations": []}"#));
    }

    #[tokio::test]
    async fn test_import_accepted_waits_for_request() {
        let dir = TempDir::new().unwrap();
        let path = annotation_file(&dir);
        let (client, server) = logged_in(vec![
            (202, r#"{"rq_id": "rq-7"}"#),
            (200, r#"{"status": "queued"}"#),
            (200, r#"{"status": "started"}"#),
            (200, r#"{"status": "finished"}"#),
        ])
        .await;
        let client =
            client.with_import_poll(PollPolicy::default().with_interval(Duration::from_millis(1)));

        client
            .import_annotations(TaskID::from(7), &path, "COCO 1.0")
            .await
            .unwrap();

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 5);
        for request in &requests[2..] {
            assert_eq!(request.method, "GET");
            assert_eq!(request.target, "/api/requests/rq-7");
            assert_eq!(request.header("authorization"), Some("Token abc123"));
        }
    }

    #[tokio::test]
    async fn test_import_failed_request() {
        let dir = TempDir::new().unwrap();
        let path = annotation_file(&dir);
        let (client, server) = logged_in(vec![
            (202, r#"{"rq_id": "rq-8"}"#),
            (200, r#"{"status": "failed", "message": "unknown format"}"#),
        ])
        .await;
        let client =
            client.with_import_poll(PollPolicy::default().with_interval(Duration::from_millis(1)));

        let result = client
            .import_annotations(TaskID::from(8), &path, "COCO 1.0")
            .await;
        assert!(matches!(&result, Err(Error::ImportFailed(msg)) if msg == "unknown format"));
        assert_eq!(server.await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_import_accepted_without_request_id() {
        let dir = TempDir::new().unwrap();
        let path = annotation_file(&dir);
        let (client, server) = logged_in(vec![(202, "{}")]).await;

        let result = client
            .import_annotations(TaskID::from(7), &path, "COCO 1.0")
            .await;
        assert!(matches!(result, Err(Error::InvalidResponse)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_import_bounded_poll_times_out() {
        let dir = TempDir::new().unwrap();
        let path = annotation_file(&dir);
        let (client, server) = logged_in(vec![
            (202, r#"{"rq_id": "rq-9"}"#),
            (200, r#"{"status": "started"}"#),
            (200, r#"{"status": "started"}"#),
        ])
        .await;
        let client = client.with_import_poll(
            PollPolicy::default()
                .with_interval(Duration::from_millis(1))
                .with_max_attempts(2),
        );

        let result = client
            .import_annotations(TaskID::from(9), &path, "COCO 1.0")
            .await;
        assert!(matches!(result, Err(Error::PollTimeout { attempts: 2, .. })));
        server.await.unwrap();
    }
}
